//! The single-row `key_params` table: everything needed to turn the
//! vault password back into the master key and check it.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use zeroize::Zeroize;

use crate::crypto::kdf::{derive_master_key, generate_salt, Argon2Params, SALT_LEN};
use crate::crypto::keys::VERIFIER_LEN;
use crate::crypto::MasterKey;
use crate::errors::{Result, VaultedError};

/// Stored key-derivation parameters and password verifier.
#[derive(Debug, Clone)]
pub struct KeyParams {
    pub salt: Vec<u8>,
    pub argon2: Argon2Params,
    pub verifier: Vec<u8>,
}

impl KeyParams {
    /// Pick a fresh salt, derive the master key for `password`, and
    /// compute its verifier.
    pub fn generate(password: &[u8], argon2: &Argon2Params) -> Result<(Self, MasterKey)> {
        let salt = generate_salt();
        let mut master_bytes = derive_master_key(password, &salt, argon2)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        let params = Self {
            salt: salt.to_vec(),
            argon2: *argon2,
            verifier: master_key.verifier()?,
        };
        Ok((params, master_key))
    }

    /// Derive the master key for `password` and check it against the
    /// stored verifier.
    pub fn unlock(&self, password: &[u8]) -> Result<MasterKey> {
        let mut master_bytes = derive_master_key(password, &self.salt, &self.argon2)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        if master_key.matches_verifier(&self.verifier)? {
            Ok(master_key)
        } else {
            Err(VaultedError::WrongPassword)
        }
    }
}

/// Typed access to the `key_params` table of one open vault.
pub struct KeyParamsStore<'a> {
    conn: &'a Connection,
    path: &'a Path,
}

impl<'a> KeyParamsStore<'a> {
    pub fn new(conn: &'a Connection, path: &'a Path) -> Self {
        Self { conn, path }
    }

    /// Insert or replace the key params row.
    pub fn save(&self, key_params: &KeyParams) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO key_params
                    (id, salt, memoryKib, iterations, parallelism, verifier)
                 VALUES (0, ?1, ?2, ?3, ?4, ?5)",
                params![
                    key_params.salt,
                    key_params.argon2.memory_kib,
                    key_params.argon2.iterations,
                    key_params.argon2.parallelism,
                    key_params.verifier,
                ],
            )
            .map_err(|e| VaultedError::corrupted("write key params", self.path, e))?;
        Ok(())
    }

    /// Read the key params row and check it is usable.
    ///
    /// Out-of-range Argon2 costs and wrong-sized salt or verifier blobs
    /// are reported as `Corrupted` before any key derivation runs.
    pub fn load(&self) -> Result<KeyParams> {
        let row = self
            .conn
            .query_row(
                "SELECT salt, memoryKib, iterations, parallelism, verifier
                 FROM key_params WHERE id = 0",
                [],
                |row| {
                    Ok(KeyParams {
                        salt: row.get(0)?,
                        argon2: Argon2Params {
                            memory_kib: row.get(1)?,
                            iterations: row.get(2)?,
                            parallelism: row.get(3)?,
                        },
                        verifier: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|e| VaultedError::corrupted("read key params", self.path, e))?;

        let key_params = row.ok_or_else(|| {
            VaultedError::InvalidFormat(format!(
                "{} has no key derivation parameters",
                self.path.display()
            ))
        })?;
        self.check(&key_params)?;
        Ok(key_params)
    }

    fn check(&self, key_params: &KeyParams) -> Result<()> {
        key_params
            .argon2
            .check_bounds()
            .map_err(|msg| VaultedError::corrupted("read key params", self.path, msg))?;
        if key_params.salt.len() != SALT_LEN {
            return Err(VaultedError::corrupted(
                "read key params",
                self.path,
                format!("salt is {} bytes, expected {SALT_LEN}", key_params.salt.len()),
            ));
        }
        if key_params.verifier.len() != VERIFIER_LEN {
            return Err(VaultedError::corrupted(
                "read key params",
                self.path,
                format!(
                    "verifier is {} bytes, expected {VERIFIER_LEN}",
                    key_params.verifier.len()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::schema;

    #[test]
    fn generate_then_unlock() {
        let (params, key) = KeyParams::generate(b"correct horse", &Argon2Params::minimum()).unwrap();
        let again = params.unlock(b"correct horse").unwrap();
        assert_eq!(key.as_bytes(), again.as_bytes());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (params, _) = KeyParams::generate(b"correct horse", &Argon2Params::minimum()).unwrap();
        assert!(matches!(
            params.unlock(b"battery staple"),
            Err(VaultedError::WrongPassword)
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        let store = KeyParamsStore::new(&conn, Path::new("k.vault"));

        let (params, _) = KeyParams::generate(b"correct horse", &Argon2Params::minimum()).unwrap();
        store.save(&params).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.salt, params.salt);
        assert_eq!(loaded.argon2, params.argon2);
        assert!(loaded.unlock(b"correct horse").is_ok());
    }

    #[test]
    fn missing_row_is_invalid_format() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        let err = KeyParamsStore::new(&conn, Path::new("k.vault"))
            .load()
            .unwrap_err();
        assert!(matches!(err, VaultedError::InvalidFormat(_)));
    }

    fn stored(conn: &Connection) -> KeyParamsStore<'_> {
        schema::create_tables(conn).unwrap();
        let store = KeyParamsStore::new(conn, Path::new("k.vault"));
        let (params, _) = KeyParams::generate(b"correct horse", &Argon2Params::minimum()).unwrap();
        store.save(&params).unwrap();
        store
    }

    #[test]
    fn out_of_range_costs_are_corrupted() {
        for update in [
            "UPDATE key_params SET memoryKib = 4294967295",
            "UPDATE key_params SET memoryKib = 16",
            "UPDATE key_params SET iterations = 0",
            "UPDATE key_params SET parallelism = 100000",
            "UPDATE key_params SET memoryKib = -1",
        ] {
            let conn = Connection::open_in_memory().unwrap();
            let store = stored(&conn);
            conn.execute(update, []).unwrap();
            let err = store.load().unwrap_err();
            assert!(
                matches!(err, VaultedError::Corrupted { operation: "read key params", .. }),
                "{update}: {err:?}"
            );
        }
    }

    #[test]
    fn wrong_sized_blobs_are_corrupted() {
        for update in [
            "UPDATE key_params SET salt = x'0102'",
            "UPDATE key_params SET verifier = x''",
            "UPDATE key_params SET verifier = zeroblob(64)",
        ] {
            let conn = Connection::open_in_memory().unwrap();
            let store = stored(&conn);
            conn.execute(update, []).unwrap();
            assert!(matches!(
                store.load(),
                Err(VaultedError::Corrupted { operation: "read key params", .. })
            ));
        }
    }
}
