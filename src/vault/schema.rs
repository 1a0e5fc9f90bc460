//! On-disk layout of a `.vault` file.
//!
//! A vault is a SQLite database with three tables:
//!
//! ```text
//! metadata    single row (id = 0): name, description, timestamps, enableTimestamps
//! passwords   one row per credential; text fields hold base64(nonce || AES-GCM ciphertext)
//! key_params  single row (id = 0): Argon2id salt + parameters and the password verifier
//! ```
//!
//! Column names keep the camelCase spelling vault files have always used.

use rusqlite::Connection;

/// Extension (without the dot) that identifies vault files.
pub const VAULT_FILE_EXTENSION: &str = "vault";

/// Tables every vault must contain.
pub const REQUIRED_TABLES: [&str; 3] = ["metadata", "passwords", "key_params"];

const CREATE_METADATA: &str = "
    CREATE TABLE IF NOT EXISTS metadata (
        id INTEGER PRIMARY KEY DEFAULT 0,
        name TEXT NOT NULL,
        description TEXT,
        createdAt INTEGER,
        updatedAt INTEGER,
        lastPasswordChange INTEGER,
        enableTimestamps INTEGER NOT NULL DEFAULT 1
    );";

const CREATE_PASSWORDS: &str = "
    CREATE TABLE IF NOT EXISTS passwords (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        password TEXT NOT NULL,
        createdAt INTEGER NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updatedAt INTEGER NOT NULL DEFAULT CURRENT_TIMESTAMP,
        name TEXT NOT NULL,
        description TEXT,
        email TEXT,
        isFavorite INTEGER NOT NULL DEFAULT 0
    );";

const CREATE_KEY_PARAMS: &str = "
    CREATE TABLE IF NOT EXISTS key_params (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        salt BLOB NOT NULL,
        memoryKib INTEGER NOT NULL,
        iterations INTEGER NOT NULL,
        parallelism INTEGER NOT NULL,
        verifier BLOB NOT NULL
    );";

/// Create all vault tables.
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_METADATA)?;
    conn.execute_batch(CREATE_PASSWORDS)?;
    conn.execute_batch(CREATE_KEY_PARAMS)?;
    Ok(())
}

/// Return the required tables that are absent from `conn`.
///
/// Fails with `SQLITE_NOTADB` when the file is not a SQLite database.
pub fn missing_tables(conn: &Connection) -> rusqlite::Result<Vec<&'static str>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|t| !present.iter().any(|p| p == t))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        assert!(missing_tables(&conn).unwrap().is_empty());
    }

    #[test]
    fn reports_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_METADATA).unwrap();
        assert_eq!(missing_tables(&conn).unwrap(), vec!["passwords", "key_params"]);
    }
}
