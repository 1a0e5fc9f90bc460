//! Vault module: SQLite-backed credential storage.
//!
//! This module provides:
//! - Credential records and their encrypted table (`credential`)
//! - The single-row vault metadata table (`metadata`)
//! - Key derivation parameters and the password verifier (`key_params`)
//! - `VaultSession`, the open/unlock/lock/close lifecycle (`session`)
//! - Listing and creating vaults in a directory (`directory`)

pub mod credential;
pub mod directory;
pub mod key_params;
pub mod lock;
pub mod metadata;
pub mod schema;
pub mod session;
pub mod validate;

// Re-export the most commonly used items.
pub use credential::{Credential, CredentialFilter, NewCredential};
pub use directory::{create_vault, list_configured, list_vaults, list_vaults_at, vault_file_path};
pub use metadata::{MetadataUpdate, NewVault, VaultMetadata};
pub use schema::VAULT_FILE_EXTENSION;
pub use session::{IntegrityReport, LockState, VaultSession};
