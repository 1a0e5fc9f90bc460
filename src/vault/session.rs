//! `VaultSession`: the single point of access to one vault file.
//!
//! A session owns the SQLite connection and the advisory file lock for
//! its whole life. It starts `Locked`; `unlock` checks the password
//! against the stored verifier and keeps the master key in memory until
//! `lock` or `close`. Credential operations need the key and fail with
//! `Locked` without it; metadata can be read and written in either state.
//!
//! The cached metadata is write-through: every call that changes the
//! metadata row updates the cache in the same call.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use zeroize::Zeroizing;

use super::credential::{Credential, CredentialFilter, CredentialStore, NewCredential};
use super::key_params::{KeyParams, KeyParamsStore};
use super::lock::FileLock;
use super::metadata::{MetadataStore, MetadataUpdate, NewVault, VaultMetadata};
use super::schema::{self, VAULT_FILE_EXTENSION};
use super::validate;
use crate::crypto::kdf::{Argon2Params, KEY_LEN};
use crate::crypto::MasterKey;
use crate::errors::{Result, VaultedError};

/// Whether credential contents are currently accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Outcome of `VaultSession::integrity_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub ok: bool,
    pub message: String,
}

impl IntegrityReport {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One open vault file.
pub struct VaultSession {
    path: PathBuf,
    conn: Option<Connection>,
    file_lock: Option<FileLock>,
    master_key: Option<MasterKey>,
    metadata: Option<VaultMetadata>,
}

impl VaultSession {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open an existing vault. The session starts locked.
    ///
    /// Fails with `NotFound` if the file is missing, `InvalidFormat` if it
    /// is not a vault, and `Busy` if another session holds it.
    pub fn open(path: &Path) -> Result<Self> {
        check_vault_path(path)?;
        let file_lock = FileLock::acquire(path)?;
        let conn = open_connection(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        tracing::info!(path = %path.display(), "vault opened");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Some(conn),
            file_lock: Some(file_lock),
            master_key: None,
            metadata: None,
        })
    }

    /// Read a vault's metadata without taking the advisory lock.
    ///
    /// Opens the file read-only and closes it before returning. Used for
    /// listings, which must still see vaults another session holds.
    pub fn peek_metadata(path: &Path) -> Result<VaultMetadata> {
        check_vault_path(path)?;
        let conn = open_connection(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let metadata = MetadataStore::new(&conn, path).load()?;
        conn.close()
            .map_err(|(_, e)| VaultedError::corrupted("close vault", path, e))?;
        Ok(metadata)
    }

    /// Create a new vault file at `path`.
    ///
    /// The database is assembled in a hidden temporary file next to
    /// `path` and hard-linked into place once schema, metadata and key
    /// parameters are committed, so a failed create leaves nothing behind.
    /// The link fails if `path` appeared in the meantime, so a racing
    /// create never replaces an existing vault.
    pub fn create(
        path: &Path,
        vault: &NewVault,
        password: &[u8],
        argon2: &Argon2Params,
    ) -> Result<()> {
        if path.exists() {
            return Err(VaultedError::AlreadyExists(path.to_path_buf()));
        }
        if !has_vault_extension(path) {
            return Err(VaultedError::InvalidFormat(format!(
                "{} does not end in .{VAULT_FILE_EXTENSION}",
                path.display()
            )));
        }
        vault.validate()?;
        validate::master_password(password)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path(path);
        if let Err(e) = initialize(&tmp_path, path, vault, password, argon2) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let linked = fs::hard_link(&tmp_path, path);
        let _ = fs::remove_file(&tmp_path);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(VaultedError::AlreadyExists(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            path = %path.display(),
            timestamps = vault.enable_timestamps,
            "vault created"
        );
        Ok(())
    }

    /// Release the connection and the file lock. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.master_key = None;
        self.metadata = None;

        let result = match self.conn.take() {
            Some(conn) => {
                tracing::debug!(path = %self.path.display(), "vault closed");
                conn.close()
                    .map_err(|(_, e)| VaultedError::corrupted("close vault", &self.path, e))
            }
            None => Ok(()),
        };

        // Only after SQLite has let go of the file.
        self.file_lock = None;
        result
    }

    /// Remove the vault file from disk.
    ///
    /// The session must be closed first (`StillOpen` otherwise).
    pub fn delete_vault(&self) -> Result<()> {
        if self.conn.is_some() {
            return Err(VaultedError::StillOpen(self.path.clone()));
        }
        if !self.path.exists() {
            return Err(VaultedError::NotFound(self.path.clone()));
        }
        fs::remove_file(&self.path)?;
        tracing::info!(path = %self.path.display(), "vault deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lock state
    // ------------------------------------------------------------------

    /// Verify `password` and make credentials accessible.
    ///
    /// On `WrongPassword` the session stays locked and nothing is cached.
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        let conn = self.conn()?;
        let key_params = KeyParamsStore::new(conn, &self.path).load()?;

        let master_key = match key_params.unlock(password) {
            Ok(key) => key,
            Err(e) => {
                if matches!(e, VaultedError::WrongPassword) {
                    tracing::warn!(path = %self.path.display(), "unlock rejected");
                }
                return Err(e);
            }
        };
        let metadata = MetadataStore::new(conn, &self.path).load()?;

        self.master_key = Some(master_key);
        self.metadata = Some(metadata);
        tracing::info!(path = %self.path.display(), "vault unlocked");
        Ok(())
    }

    /// Drop the key material and cached metadata. Idempotent.
    pub fn lock(&mut self) {
        if self.master_key.take().is_some() {
            tracing::info!(path = %self.path.display(), "vault locked");
        }
        self.metadata = None;
    }

    pub fn lock_state(&self) -> LockState {
        if self.master_key.is_some() {
            LockState::Unlocked
        } else {
            LockState::Locked
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state() == LockState::Locked
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata cached by `unlock`; `None` while locked.
    pub fn cached_metadata(&self) -> Option<&VaultMetadata> {
        self.metadata.as_ref()
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Read the metadata row, annotated with this vault's path.
    pub fn get_metadata(&self) -> Result<VaultMetadata> {
        MetadataStore::new(self.conn()?, &self.path).load()
    }

    /// Merge `update` over the current metadata and persist it.
    ///
    /// `updatedAt` is stamped when the merged record tracks timestamps.
    pub fn update_metadata(&mut self, update: &MetadataUpdate) -> Result<VaultMetadata> {
        let store = MetadataStore::new(self.conn()?, &self.path);
        let current = match &self.metadata {
            Some(cached) => cached.clone(),
            None => store.load()?,
        };

        let mut merged = update.apply_to(&current)?;
        if merged.enable_timestamps {
            merged.updated_at = Some(now_millis());
        }
        store.save(&merged)?;

        if self.metadata.is_some() {
            self.metadata = Some(merged.clone());
        }
        Ok(merged)
    }

    /// Stamp `lastPasswordChange`, if this vault tracks timestamps.
    pub fn record_password_change(&mut self) -> Result<()> {
        let store = MetadataStore::new(self.conn()?, &self.path);
        let (id, enabled) = match &self.metadata {
            Some(cached) => (cached.id, cached.enable_timestamps),
            None => {
                let loaded = store.load()?;
                (loaded.id, loaded.enable_timestamps)
            }
        };
        if !enabled {
            return Ok(());
        }

        let now = now_millis();
        store.touch_password_change(id, now)?;
        if let Some(cached) = self.metadata.as_mut() {
            cached.last_password_change = Some(now);
        }
        Ok(())
    }

    /// Change the vault's unlock password.
    ///
    /// Verifies `current`, then re-encrypts every credential under a key
    /// derived from `new` with a fresh salt, in one transaction. The
    /// session stays unlocked under the new key.
    pub fn change_password(
        &mut self,
        current: &[u8],
        new: &[u8],
        argon2: &Argon2Params,
    ) -> Result<()> {
        let old_key = self.credential_key()?;
        validate::master_password(new)?;

        let stamp = self.stamping_metadata_id();
        let path = &self.path;
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| VaultedError::SessionClosed(path.clone()))?;

        KeyParamsStore::new(conn, path).load()?.unlock(current)?;
        let (new_params, new_master) = KeyParams::generate(new, argon2)?;
        let new_key = Zeroizing::new(new_master.derive_credential_key()?);
        let now = now_millis();

        let tx = conn
            .transaction()
            .map_err(|e| VaultedError::corrupted("change password", path, e))?;
        let count = CredentialStore::new(&tx, &old_key[..], path).reencrypt_all(&new_key[..])?;
        KeyParamsStore::new(&tx, path).save(&new_params)?;
        if let Some(id) = stamp {
            MetadataStore::new(&tx, path).touch_password_change(id, now)?;
        }
        tx.commit()
            .map_err(|e| VaultedError::corrupted("change password", path, e))?;

        self.master_key = Some(new_master);
        if stamp.is_some() {
            if let Some(cached) = self.metadata.as_mut() {
                cached.last_password_change = Some(now);
            }
        }
        tracing::info!(path = %self.path.display(), credentials = count, "vault password changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// All credentials, most recently updated first.
    pub fn list_credentials(&self) -> Result<Vec<Credential>> {
        self.list_credentials_filtered(&CredentialFilter::default())
    }

    pub fn list_credentials_filtered(&self, filter: &CredentialFilter) -> Result<Vec<Credential>> {
        let key = self.credential_key()?;
        CredentialStore::new(self.conn()?, &key[..], &self.path).list(filter)
    }

    pub fn get_credential(&self, id: i64) -> Result<Credential> {
        let key = self.credential_key()?;
        CredentialStore::new(self.conn()?, &key[..], &self.path).get(id)
    }

    /// Add a credential and return its id.
    pub fn add_credential(&mut self, new: &NewCredential) -> Result<i64> {
        let id = self.mutate("add credential", |store, now| store.insert(new, now))?;
        tracing::debug!(path = %self.path.display(), id, "credential added");
        Ok(id)
    }

    /// Replace the stored record with the same id.
    pub fn update_credential(&mut self, record: &Credential) -> Result<()> {
        self.mutate("update credential", |store, now| store.update(record, now))?;
        tracing::debug!(path = %self.path.display(), id = record.id, "credential updated");
        Ok(())
    }

    pub fn toggle_favorite(&mut self, id: i64, is_favorite: bool) -> Result<()> {
        self.mutate("toggle favorite", |store, now| {
            store.set_favorite(id, is_favorite, now)
        })?;
        tracing::debug!(path = %self.path.display(), id, is_favorite, "favorite toggled");
        Ok(())
    }

    pub fn delete_credential(&mut self, record: &Credential) -> Result<()> {
        self.mutate("delete credential", |store, _| store.delete(record.id))?;
        tracing::debug!(path = %self.path.display(), id = record.id, "credential deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Probe both tables with cheap reads. Never fails; the report says
    /// what went wrong.
    pub fn integrity_check(&self) -> IntegrityReport {
        let Some(conn) = self.conn.as_ref() else {
            return IntegrityReport::fail("session is closed");
        };

        let sample = || -> rusqlite::Result<(i64, i64, String)> {
            let metadata_rows = conn.query_row("SELECT COUNT(*) FROM metadata", [], |r| r.get(0))?;
            let credential_rows =
                conn.query_row("SELECT COUNT(*) FROM passwords", [], |r| r.get(0))?;
            let quick_check = conn.query_row("PRAGMA quick_check", [], |r| r.get(0))?;
            Ok((metadata_rows, credential_rows, quick_check))
        };

        match sample() {
            Ok((1, credentials, quick)) if quick == "ok" => {
                IntegrityReport::pass(format!("vault ok: {credentials} credential record(s)"))
            }
            Ok((metadata_rows, _, _)) if metadata_rows != 1 => IntegrityReport::fail(format!(
                "expected exactly one metadata row, found {metadata_rows}"
            )),
            Ok((_, _, quick)) => IntegrityReport::fail(format!("sqlite quick_check: {quick}")),
            Err(e) => IntegrityReport::fail(format!("sample read failed: {e}")),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| VaultedError::SessionClosed(self.path.clone()))
    }

    /// The credential key, or `Locked`. Zeroized when dropped.
    fn credential_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        self.conn()?;
        let master_key = self.master_key.as_ref().ok_or(VaultedError::Locked)?;
        Ok(Zeroizing::new(master_key.derive_credential_key()?))
    }

    /// Metadata row id when mutations should stamp timestamps.
    fn stamping_metadata_id(&self) -> Option<i64> {
        self.metadata
            .as_ref()
            .filter(|m| m.enable_timestamps)
            .map(|m| m.id)
    }

    /// Run a credential mutation and the metadata `updatedAt` stamp in
    /// one transaction.
    fn mutate<T>(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&CredentialStore<'_>, i64) -> Result<T>,
    ) -> Result<T> {
        let key = self.credential_key()?;
        let stamp = self.stamping_metadata_id();
        let now = now_millis();

        let path = &self.path;
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| VaultedError::SessionClosed(path.clone()))?;
        let tx = conn
            .transaction()
            .map_err(|e| VaultedError::corrupted(operation, path, e))?;

        let out = apply(&CredentialStore::new(&tx, &key[..], path), now)?;
        if let Some(id) = stamp {
            MetadataStore::new(&tx, path).touch_updated_at(id, now)?;
        }
        tx.commit()
            .map_err(|e| VaultedError::corrupted(operation, path, e))?;

        if stamp.is_some() {
            if let Some(cached) = self.metadata.as_mut() {
                cached.updated_at = Some(now);
            }
        }
        Ok(out)
    }
}

impl Drop for VaultSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ----------------------------------------------------------------------
// File helpers
// ----------------------------------------------------------------------

fn has_vault_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == VAULT_FILE_EXTENSION)
}

fn check_vault_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(VaultedError::NotFound(path.to_path_buf()));
    }
    if !has_vault_extension(path) || !path.is_file() {
        return Err(VaultedError::InvalidFormat(format!(
            "{} is not a .{VAULT_FILE_EXTENSION} file",
            path.display()
        )));
    }
    Ok(())
}

/// Open `path` and confirm it carries every vault table.
fn open_connection(path: &Path, flags: OpenFlags) -> Result<Connection> {
    let conn =
        Connection::open_with_flags(path, flags).map_err(|e| classify(e, "open vault", path))?;

    let missing = schema::missing_tables(&conn).map_err(|e| classify(e, "inspect schema", path))?;
    if !missing.is_empty() {
        return Err(VaultedError::InvalidFormat(format!(
            "{} is missing table(s): {}",
            path.display(),
            missing.join(", ")
        )));
    }
    Ok(conn)
}

/// A file that is not SQLite at all is a format problem, anything else
/// from the driver is corruption.
fn classify(err: rusqlite::Error, operation: &'static str, path: &Path) -> VaultedError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::NotADatabase => {
            VaultedError::InvalidFormat(format!("{} is not a vault database", path.display()))
        }
        _ => VaultedError::corrupted(operation, path, err),
    }
}

/// Sibling path used while a vault is being created.
fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.{:016x}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        rand::random::<u64>()
    ))
}

/// Build a complete vault database at `tmp_path`.
fn initialize(
    tmp_path: &Path,
    path: &Path,
    vault: &NewVault,
    password: &[u8],
    argon2: &Argon2Params,
) -> Result<()> {
    let (key_params, _master_key) = KeyParams::generate(password, argon2)?;

    let mut conn =
        Connection::open(tmp_path).map_err(|e| VaultedError::corrupted("create vault", path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp_path, fs::Permissions::from_mode(0o600))?;
    }

    let tx = conn
        .transaction()
        .map_err(|e| VaultedError::corrupted("create vault", path, e))?;
    schema::create_tables(&tx).map_err(|e| VaultedError::corrupted("create tables", path, e))?;
    MetadataStore::new(&tx, path).insert(vault, now_millis())?;
    KeyParamsStore::new(&tx, path).save(&key_params)?;
    tx.commit()
        .map_err(|e| VaultedError::corrupted("create vault", path, e))?;

    conn.close()
        .map_err(|(_, e)| VaultedError::corrupted("create vault", path, e))
}
