//! The single-row `metadata` table.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::validate;
use crate::errors::{Result, VaultedError};

/// Fixed id of the one metadata row in every vault.
pub const METADATA_ROW_ID: i64 = 0;

/// Vault-level metadata, annotated with the file it was read from.
///
/// Timestamps are milliseconds since the Unix epoch; `None` means the
/// value is not tracked (stored as NULL or 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultMetadata {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub last_password_change: Option<i64>,
    pub enable_timestamps: bool,
    pub file_path: PathBuf,
}

/// Everything needed to create a vault's metadata row.
#[derive(Debug, Clone)]
pub struct NewVault {
    pub name: String,
    pub description: Option<String>,
    pub enable_timestamps: bool,
}

impl NewVault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enable_timestamps: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate::name("vault name", &self.name)?;
        validate::description(self.description.as_deref())
    }
}

/// Partial metadata update; `None` fields keep their current value.
///
/// `description: Some(String::new())` clears the description.
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enable_timestamps: Option<bool>,
}

impl MetadataUpdate {
    /// Merge this update over `current`, validating the result.
    pub fn apply_to(&self, current: &VaultMetadata) -> Result<VaultMetadata> {
        let mut merged = current.clone();
        if let Some(name) = &self.name {
            validate::name("vault name", name)?;
            merged.name = name.clone();
        }
        if let Some(description) = &self.description {
            validate::description(Some(description))?;
            merged.description = validate::non_empty(Some(description));
        }
        if let Some(enabled) = self.enable_timestamps {
            merged.enable_timestamps = enabled;
        }
        Ok(merged)
    }
}

/// Typed access to the `metadata` table of one open vault.
pub struct MetadataStore<'a> {
    conn: &'a Connection,
    path: &'a Path,
}

impl<'a> MetadataStore<'a> {
    pub fn new(conn: &'a Connection, path: &'a Path) -> Self {
        Self { conn, path }
    }

    /// Insert the metadata row for a new vault.
    ///
    /// All three timestamps are seeded with `now` only when timestamp
    /// tracking is enabled.
    pub fn insert(&self, vault: &NewVault, now: i64) -> Result<()> {
        let stamp = vault.enable_timestamps.then_some(now);
        self.conn
            .execute(
                "INSERT INTO metadata
                    (id, name, description, createdAt, updatedAt, lastPasswordChange, enableTimestamps)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?4, ?5)",
                params![
                    METADATA_ROW_ID,
                    vault.name,
                    validate::non_empty(vault.description.as_deref()),
                    stamp,
                    vault.enable_timestamps,
                ],
            )
            .map_err(|e| VaultedError::corrupted("insert metadata", self.path, e))?;
        Ok(())
    }

    /// Read the metadata row.
    ///
    /// A missing row means the file is not a well-formed vault
    /// (`InvalidFormat`); a failing query means it is damaged (`Corrupted`).
    pub fn load(&self) -> Result<VaultMetadata> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, createdAt, updatedAt, lastPasswordChange, enableTimestamps
                 FROM metadata ORDER BY id LIMIT 1",
                [],
                |row| {
                    Ok(VaultMetadata {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        created_at: tracked(row.get(3)?),
                        updated_at: tracked(row.get(4)?),
                        last_password_change: tracked(row.get(5)?),
                        enable_timestamps: row.get(6)?,
                        file_path: self.path.to_path_buf(),
                    })
                },
            )
            .optional()
            .map_err(|e| VaultedError::corrupted("read metadata", self.path, e))?;

        row.ok_or_else(|| {
            VaultedError::InvalidFormat(format!("{} has no metadata row", self.path.display()))
        })
    }

    /// Persist the user-editable fields and `updatedAt` of `metadata`.
    pub fn save(&self, metadata: &VaultMetadata) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE metadata
                 SET name = ?1, description = ?2, enableTimestamps = ?3, updatedAt = ?4
                 WHERE id = ?5",
                params![
                    metadata.name,
                    metadata.description,
                    metadata.enable_timestamps,
                    metadata.updated_at,
                    metadata.id,
                ],
            )
            .map_err(|e| VaultedError::corrupted("update metadata", self.path, e))?;
        self.expect_one_row(changed, "update metadata")
    }

    /// Stamp `updatedAt`.
    pub fn touch_updated_at(&self, id: i64, now: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE metadata SET updatedAt = ?1 WHERE id = ?2",
                params![now, id],
            )
            .map_err(|e| VaultedError::corrupted("stamp metadata updatedAt", self.path, e))?;
        self.expect_one_row(changed, "stamp metadata updatedAt")
    }

    /// Stamp `lastPasswordChange`.
    pub fn touch_password_change(&self, id: i64, now: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE metadata SET lastPasswordChange = ?1 WHERE id = ?2",
                params![now, id],
            )
            .map_err(|e| VaultedError::corrupted("stamp lastPasswordChange", self.path, e))?;
        self.expect_one_row(changed, "stamp lastPasswordChange")
    }

    fn expect_one_row(&self, changed: usize, operation: &'static str) -> Result<()> {
        if changed == 1 {
            Ok(())
        } else {
            Err(VaultedError::corrupted(
                operation,
                self.path,
                format!("expected one metadata row, updated {changed}"),
            ))
        }
    }
}

/// Map the stored "not tracked" encodings (NULL and 0) to `None`.
fn tracked(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v != 0)
}
