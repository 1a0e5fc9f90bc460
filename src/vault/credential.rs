//! Credential records and the `passwords` table that stores them.
//!
//! `name`, `email`, `password` and `description` are encrypted per field
//! with the session's credential key before they reach SQLite; ids,
//! timestamps and the favorite flag stay in clear so the table can be
//! ordered and filtered without decrypting.

use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::validate;
use crate::crypto::encryption::{decrypt_field, encrypt_field};
use crate::errors::{Result, VaultedError};

/// A stored credential, decrypted.
///
/// Field values are wiped from memory when the record is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub password: String,
    pub description: Option<String>,
    pub is_favorite: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("description", &self.description)
            .field("is_favorite", &self.is_favorite)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for adding a credential.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct NewCredential {
    pub name: String,
    pub email: Option<String>,
    pub password: String,
    pub description: Option<String>,
    pub is_favorite: bool,
}

impl NewCredential {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            password: password.into(),
            description: None,
            is_favorite: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.name,
            self.email.as_deref(),
            &self.password,
            self.description.as_deref(),
        )
    }
}

fn validate_fields(
    name: &str,
    email: Option<&str>,
    password: &str,
    description: Option<&str>,
) -> Result<()> {
    validate::name("credential name", name)?;
    validate::email(email)?;
    validate::secret(password)?;
    validate::description(description)
}

/// Narrows a credential listing.
#[derive(Debug, Clone, Default)]
pub struct CredentialFilter {
    /// Only return favorites.
    pub favorites_only: bool,
    /// Case-insensitive substring match on the credential name.
    pub search: Option<String>,
}

impl CredentialFilter {
    fn matches(&self, credential: &Credential) -> bool {
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => credential
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// Columns exactly as stored: encrypted text plus clear bookkeeping.
struct StoredRow {
    id: i64,
    name: String,
    email: Option<String>,
    password: String,
    description: Option<String>,
    is_favorite: bool,
    created_at: i64,
    updated_at: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            description: row.get(4)?,
            is_favorite: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, email, password, description, isFavorite, createdAt, updatedAt FROM passwords";

/// Typed access to the `passwords` table of one unlocked vault.
pub struct CredentialStore<'a> {
    conn: &'a Connection,
    key: &'a [u8],
    path: &'a Path,
}

impl<'a> CredentialStore<'a> {
    pub fn new(conn: &'a Connection, key: &'a [u8], path: &'a Path) -> Self {
        Self { conn, key, path }
    }

    /// Insert a credential; `createdAt` and `updatedAt` are both `now`.
    pub fn insert(&self, new: &NewCredential, now: i64) -> Result<i64> {
        new.validate()?;

        self.conn
            .execute(
                "INSERT INTO passwords
                    (name, email, password, description, isFavorite, createdAt, updatedAt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    self.seal(&new.name)?,
                    self.seal_optional(new.email.as_deref())?,
                    self.seal(&new.password)?,
                    self.seal_optional(new.description.as_deref())?,
                    new.is_favorite,
                    now,
                ],
            )
            .map_err(|e| VaultedError::corrupted("insert credential", self.path, e))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Replace every editable field of `record.id` and stamp `updatedAt`.
    ///
    /// `createdAt` is never rewritten.
    pub fn update(&self, record: &Credential, now: i64) -> Result<()> {
        validate_fields(
            &record.name,
            record.email.as_deref(),
            &record.password,
            record.description.as_deref(),
        )?;

        let changed = self
            .conn
            .execute(
                "UPDATE passwords
                 SET name = ?1, email = ?2, password = ?3, description = ?4,
                     isFavorite = ?5, updatedAt = ?6
                 WHERE id = ?7",
                params![
                    self.seal(&record.name)?,
                    self.seal_optional(record.email.as_deref())?,
                    self.seal(&record.password)?,
                    self.seal_optional(record.description.as_deref())?,
                    record.is_favorite,
                    now,
                    record.id,
                ],
            )
            .map_err(|e| VaultedError::corrupted("update credential", self.path, e))?;

        found(changed, record.id)
    }

    pub fn set_favorite(&self, id: i64, is_favorite: bool, now: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE passwords SET isFavorite = ?1, updatedAt = ?2 WHERE id = ?3",
                params![is_favorite, now, id],
            )
            .map_err(|e| VaultedError::corrupted("toggle favorite", self.path, e))?;
        found(changed, id)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM passwords WHERE id = ?1", params![id])
            .map_err(|e| VaultedError::corrupted("delete credential", self.path, e))?;
        found(changed, id)
    }

    pub fn get(&self, id: i64) -> Result<Credential> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                StoredRow::from_row,
            )
            .optional()
            .map_err(|e| VaultedError::corrupted("read credential", self.path, e))?
            .ok_or(VaultedError::CredentialNotFound(id))?;

        self.open(&row)
    }

    /// All credentials matching `filter`, most recently updated first.
    ///
    /// Ties on `updatedAt` fall back to the newest id.
    pub fn list(&self, filter: &CredentialFilter) -> Result<Vec<Credential>> {
        let sql = if filter.favorites_only {
            format!("{SELECT_COLUMNS} WHERE isFavorite = 1 ORDER BY updatedAt DESC, id DESC")
        } else {
            format!("{SELECT_COLUMNS} ORDER BY updatedAt DESC, id DESC")
        };

        let rows = self
            .read_rows(&sql)
            .map_err(|e| VaultedError::corrupted("list credentials", self.path, e))?;

        let mut credentials = Vec::with_capacity(rows.len());
        for row in rows {
            let credential = self.open(&row)?;
            if filter.matches(&credential) {
                credentials.push(credential);
            }
        }
        Ok(credentials)
    }

    /// Re-encrypt every row under `new_key`. Returns the row count.
    ///
    /// Run inside a transaction: a failure part-way leaves mixed keys.
    pub fn reencrypt_all(&self, new_key: &[u8]) -> Result<usize> {
        let rows = self
            .read_rows(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .map_err(|e| VaultedError::corrupted("read credentials for re-key", self.path, e))?;
        let target = CredentialStore::new(self.conn, new_key, self.path);

        for row in &rows {
            let plain = self.open(row)?;

            self.conn
                .execute(
                    "UPDATE passwords SET name = ?1, email = ?2, password = ?3, description = ?4
                     WHERE id = ?5",
                    params![
                        target.seal(&plain.name)?,
                        target.seal_optional(plain.email.as_deref())?,
                        target.seal(&plain.password)?,
                        target.seal_optional(plain.description.as_deref())?,
                        row.id,
                    ],
                )
                .map_err(|e| VaultedError::corrupted("re-encrypt credential", self.path, e))?;
        }
        Ok(rows.len())
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM passwords", [], |row| row.get(0))
            .map_err(|e| VaultedError::corrupted("count credentials", self.path, e))
    }

    // ------------------------------------------------------------------
    // Field encryption
    // ------------------------------------------------------------------

    fn read_rows(&self, sql: &str) -> rusqlite::Result<Vec<StoredRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], StoredRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn seal(&self, value: &str) -> Result<String> {
        encrypt_field(self.key, value)
    }

    fn seal_optional(&self, value: Option<&str>) -> Result<Option<String>> {
        validate::non_empty(value)
            .map(|v| self.seal(&v))
            .transpose()
    }

    fn open(&self, row: &StoredRow) -> Result<Credential> {
        let id = row.id;
        let unseal = |stored: &str| {
            decrypt_field(self.key, stored).map_err(|e| {
                VaultedError::corrupted("decrypt credential", self.path, format!("#{id}: {e}"))
            })
        };

        Ok(Credential {
            id,
            name: unseal(&row.name)?,
            email: row.email.as_deref().map(&unseal).transpose()?,
            password: unseal(&row.password)?,
            description: row.description.as_deref().map(&unseal).transpose()?,
            is_favorite: row.is_favorite,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn found(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        Err(VaultedError::CredentialNotFound(id))
    } else {
        Ok(())
    }
}
