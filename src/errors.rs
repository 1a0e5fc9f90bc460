use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Vaulted.
#[derive(Debug, Error)]
pub enum VaultedError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: stored data does not authenticate")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    NotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidFormat(String),

    #[error("Vault is locked; unlock it first")]
    Locked,

    #[error("Wrong password for this vault")]
    WrongPassword,

    #[error(
        "Vault storage is corrupted ({operation} on {path}): {detail}. \
         Restore the vault from a backup or recreate it"
    )]
    Corrupted {
        operation: &'static str,
        path: PathBuf,
        detail: String,
    },

    #[error("Vault {0} is in use by another session")]
    Busy(PathBuf),

    #[error("Vault {0} is still open; close the session before deleting it")]
    StillOpen(PathBuf),

    #[error("Session for {0} has already been closed")]
    SessionClosed(PathBuf),

    #[error("Credential #{0} not found")]
    CredentialNotFound(i64),

    #[error("Invalid input: {0}")]
    Validation(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Password mismatch: passwords do not match")]
    PasswordMismatch,
}

impl VaultedError {
    /// Wrap a storage-layer failure with the operation and file it hit.
    pub fn corrupted(
        operation: &'static str,
        path: impl Into<PathBuf>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::Corrupted {
            operation,
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

/// Convenience type alias for Vaulted results.
pub type Result<T> = std::result::Result<T, VaultedError>;
