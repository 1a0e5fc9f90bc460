//! Enumerating and creating vaults inside a directory.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use super::metadata::{NewVault, VaultMetadata};
use super::schema::VAULT_FILE_EXTENSION;
use super::session::VaultSession;
use super::validate;
use crate::config::{expand_path, Settings};
use crate::errors::{Result, VaultedError};

/// Metadata of every readable vault in `directory`, most recently
/// updated first. Vaults without an `updatedAt` sort last.
///
/// A leading `~` is expanded to the home directory. A missing directory
/// yields an empty list. Files that cannot be read as vaults are logged
/// and skipped so one damaged file never hides the rest.
pub fn list_vaults(directory: &str) -> Result<Vec<VaultMetadata>> {
    list_vaults_at(&expand_path(directory))
}

/// `list_vaults` over the configured vaults directory.
pub fn list_configured(settings: &Settings) -> Result<Vec<VaultMetadata>> {
    list_vaults_at(&settings.vaults_dir())
}

/// `list_vaults` for an already resolved directory. The path is used
/// as-is, with no `~` expansion or string conversion.
pub fn list_vaults_at(dir: &Path) -> Result<Vec<VaultMetadata>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "vault directory does not exist");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_vault = path.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext == VAULT_FILE_EXTENSION);
        if is_vault {
            paths.push(path);
        }
    }
    paths.sort();

    let mut vaults = Vec::with_capacity(paths.len());
    for path in paths {
        match VaultSession::peek_metadata(&path) {
            Ok(metadata) => vaults.push(metadata),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable vault"),
        }
    }

    vaults.sort_by_key(|m| Reverse(m.updated_at.unwrap_or(0)));
    Ok(vaults)
}

/// The path a vault called `name` gets inside `dir`.
///
/// Names that would escape the directory are rejected.
pub fn vault_file_path(dir: &Path, name: &str) -> Result<PathBuf> {
    validate::name("vault name", name)?;
    let escapes = name.contains(['/', '\\'])
        || name == "."
        || name == ".."
        || name.starts_with('.');
    if escapes {
        return Err(VaultedError::Validation(format!(
            "vault name '{name}' cannot contain path separators or start with '.'"
        )));
    }
    Ok(dir.join(format!("{name}.{VAULT_FILE_EXTENSION}")))
}

/// Create `vault` in the configured directory and return its path.
pub fn create_vault(settings: &Settings, vault: &NewVault, password: &[u8]) -> Result<PathBuf> {
    let path = vault_file_path(&settings.vaults_dir(), &vault.name)?;
    VaultSession::create(&path, vault, password, &settings.argon2_params())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_file_path_appends_extension() {
        let path = vault_file_path(Path::new("/vaults"), "personal").unwrap();
        assert_eq!(path, PathBuf::from("/vaults/personal.vault"));
    }

    #[test]
    fn vault_file_path_rejects_escapes() {
        for bad in ["../up", "a/b", "a\\b", ".hidden", ".."] {
            assert!(
                matches!(
                    vault_file_path(Path::new("/vaults"), bad),
                    Err(VaultedError::Validation(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_vaults(missing.to_str().unwrap()).unwrap().is_empty());
    }
}
