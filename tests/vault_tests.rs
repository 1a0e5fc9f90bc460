//! Integration tests for `VaultSession`.

use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use tempfile::TempDir;
use vaulted::crypto::Argon2Params;
use vaulted::errors::VaultedError;
use vaulted::vault::{
    list_vaults, Credential, CredentialFilter, LockState, MetadataUpdate, NewCredential,
    NewVault, VaultSession,
};

const PASSWORD: &[u8] = b"correct horse battery";

/// Helper: a vault path inside a fresh temp dir.
fn vault_path(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join(format!("{name}.vault"));
    (dir, path)
}

fn create(path: &std::path::Path, vault: &NewVault) {
    VaultSession::create(path, vault, PASSWORD, &Argon2Params::minimum()).expect("create vault");
}

fn open_unlocked(path: &std::path::Path) -> VaultSession {
    let mut session = VaultSession::open(path).expect("open vault");
    session.unlock(PASSWORD).expect("unlock vault");
    session
}

fn credential(name: &str, password: &str) -> NewCredential {
    NewCredential::new(name, password)
}

/// Let the millisecond clock move on between writes.
fn tick() {
    sleep(Duration::from_millis(3));
}

// ---------------------------------------------------------------------------
// Create / open / metadata
// ---------------------------------------------------------------------------

#[test]
fn create_then_open_reads_back_metadata() {
    for enable_timestamps in [true, false] {
        let (_dir, path) = vault_path("personal");
        let vault = NewVault {
            name: "personal".into(),
            description: Some("home accounts".into()),
            enable_timestamps,
        };
        create(&path, &vault);

        let session = VaultSession::open(&path).unwrap();
        let m = session.get_metadata().unwrap();
        assert_eq!(m.name, "personal");
        assert_eq!(m.description.as_deref(), Some("home accounts"));
        assert_eq!(m.enable_timestamps, enable_timestamps);
        assert_eq!(m.created_at.is_some(), enable_timestamps);
        assert_eq!(m.updated_at.is_some(), enable_timestamps);
        assert_eq!(m.last_password_change.is_some(), enable_timestamps);
        assert_eq!(m.file_path, path);
    }
}

#[test]
fn create_refuses_existing_path() {
    let (_dir, path) = vault_path("dup");
    create(&path, &NewVault::new("dup"));

    let err = VaultSession::create(&path, &NewVault::new("dup"), PASSWORD, &Argon2Params::minimum())
        .unwrap_err();
    assert!(matches!(err, VaultedError::AlreadyExists(_)));
}

#[test]
fn racing_creates_leave_exactly_one_vault() {
    let (dir, path) = vault_path("race");
    let passwords: Vec<String> = (0..4).map(|i| format!("racer password {i}")).collect();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = passwords
            .iter()
            .map(|pw| {
                let path = &path;
                scope.spawn(move || {
                    VaultSession::create(
                        path,
                        &NewVault::new("race"),
                        pw.as_bytes(),
                        &Argon2Params::minimum(),
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<usize> = (0..results.len()).filter(|&i| results[i].is_ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, VaultedError::AlreadyExists(_)), "{e:?}");
        }
    }

    let mut session = VaultSession::open(&path).unwrap();
    session.unlock(passwords[winners[0]].as_bytes()).unwrap();
    session.close().unwrap();

    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn create_makes_missing_parent_and_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("a.vault");
    create(&path, &NewVault::new("a"));

    assert!(path.exists());
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn create_validates_before_touching_disk() {
    let (_dir, path) = vault_path("v");

    let err = VaultSession::create(&path, &NewVault::new(""), PASSWORD, &Argon2Params::minimum())
        .unwrap_err();
    assert!(matches!(err, VaultedError::Validation(_)));

    let err = VaultSession::create(&path, &NewVault::new("v"), b"short", &Argon2Params::minimum())
        .unwrap_err();
    assert!(matches!(err, VaultedError::Validation(_)));

    assert!(!path.exists());
}

#[test]
fn open_missing_file_is_not_found() {
    let (_dir, path) = vault_path("ghost");
    assert!(matches!(
        VaultSession::open(&path),
        Err(VaultedError::NotFound(_))
    ));
}

#[test]
fn open_garbage_file_is_invalid_format() {
    let (_dir, path) = vault_path("junk");
    std::fs::write(&path, vec![0x42u8; 4096]).unwrap();
    assert!(matches!(
        VaultSession::open(&path),
        Err(VaultedError::InvalidFormat(_))
    ));
}

#[test]
fn open_sqlite_without_vault_tables_is_invalid_format() {
    let (_dir, path) = vault_path("other");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE notes (body TEXT)").unwrap();
    drop(conn);

    assert!(matches!(
        VaultSession::open(&path),
        Err(VaultedError::InvalidFormat(_))
    ));
}

#[test]
fn second_open_is_busy_until_first_closes() {
    let (_dir, path) = vault_path("shared");
    create(&path, &NewVault::new("shared"));

    let mut first = VaultSession::open(&path).unwrap();
    assert!(matches!(
        VaultSession::open(&path),
        Err(VaultedError::Busy(_))
    ));

    first.close().unwrap();
    assert!(VaultSession::open(&path).is_ok());
}

// ---------------------------------------------------------------------------
// Lock state
// ---------------------------------------------------------------------------

#[test]
fn credential_operations_require_unlock() {
    let (_dir, path) = vault_path("locked");
    create(&path, &NewVault::new("locked"));

    let mut session = VaultSession::open(&path).unwrap();
    assert_eq!(session.lock_state(), LockState::Locked);

    assert!(matches!(session.list_credentials(), Err(VaultedError::Locked)));
    assert!(matches!(
        session.add_credential(&credential("github", "pw")),
        Err(VaultedError::Locked)
    ));
    assert!(matches!(session.get_credential(1), Err(VaultedError::Locked)));
    assert!(matches!(
        session.toggle_favorite(1, true),
        Err(VaultedError::Locked)
    ));

    let record = Credential {
        id: 1,
        name: "github".into(),
        email: None,
        password: "pw".into(),
        description: None,
        is_favorite: false,
        created_at: 0,
        updated_at: 0,
    };
    assert!(matches!(
        session.update_credential(&record),
        Err(VaultedError::Locked)
    ));
    assert!(matches!(
        session.delete_credential(&record),
        Err(VaultedError::Locked)
    ));

    session.unlock(PASSWORD).unwrap();
    assert!(!session.is_locked());
    assert!(session.list_credentials().unwrap().is_empty());
    assert!(session.add_credential(&credential("github", "pw")).is_ok());
}

#[test]
fn tampered_key_params_fail_unlock_as_corrupted() {
    for update in [
        "UPDATE key_params SET memoryKib = 4294967295",
        "UPDATE key_params SET iterations = 4294967295",
        "UPDATE key_params SET salt = x'00'",
    ] {
        let (_dir, path) = vault_path("tampered");
        create(&path, &NewVault::new("tampered"));

        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(update, []).unwrap();
        drop(conn);

        let mut session = VaultSession::open(&path).unwrap();
        let err = session.unlock(PASSWORD).unwrap_err();
        assert!(
            matches!(
                err,
                VaultedError::Corrupted {
                    operation: "read key params",
                    ..
                }
            ),
            "{update}: {err:?}"
        );
        assert!(session.is_locked());
    }
}

#[test]
fn wrong_password_keeps_session_locked() {
    let (_dir, path) = vault_path("guarded");
    create(&path, &NewVault::new("guarded"));

    let mut session = VaultSession::open(&path).unwrap();
    assert!(matches!(
        session.unlock(b"not the password"),
        Err(VaultedError::WrongPassword)
    ));
    assert!(session.is_locked());
    assert!(session.cached_metadata().is_none());
    assert!(matches!(session.list_credentials(), Err(VaultedError::Locked)));
}

#[test]
fn lock_is_idempotent() {
    let (_dir, path) = vault_path("idem");
    create(&path, &NewVault::new("idem"));

    let mut session = open_unlocked(&path);
    assert!(session.cached_metadata().is_some());

    session.lock();
    session.lock();
    assert_eq!(session.lock_state(), LockState::Locked);
    assert!(session.cached_metadata().is_none());
    assert!(matches!(session.list_credentials(), Err(VaultedError::Locked)));

    // Metadata stays readable while locked.
    assert_eq!(session.get_metadata().unwrap().name, "idem");
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[test]
fn add_then_list_round_trip() {
    let (_dir, path) = vault_path("roundtrip");
    create(&path, &NewVault::new("roundtrip"));
    let mut session = open_unlocked(&path);

    let mut new = credential("github", "secret123");
    new.email = Some("me@x.com".into());
    new.description = Some("work account".into());
    new.is_favorite = true;
    let id = session.add_credential(&new).unwrap();

    let all = session.list_credentials().unwrap();
    assert_eq!(all.len(), 1);
    let c = &all[0];
    assert_eq!(c.id, id);
    assert_eq!(c.name, "github");
    assert_eq!(c.email.as_deref(), Some("me@x.com"));
    assert_eq!(c.password, "secret123");
    assert_eq!(c.description.as_deref(), Some("work account"));
    assert!(c.is_favorite);
    assert_eq!(c.created_at, c.updated_at);
}

#[test]
fn credentials_survive_reopen_and_are_not_stored_in_clear() {
    let (_dir, path) = vault_path("atrest");
    create(&path, &NewVault::new("atrest"));

    let mut session = open_unlocked(&path);
    session
        .add_credential(&credential("bank", "hunter2-very-secret"))
        .unwrap();
    session.close().unwrap();

    let raw = std::fs::read(&path).unwrap();
    let needle = b"hunter2-very-secret";
    assert!(!raw.windows(needle.len()).any(|w| w == needle));

    let session = open_unlocked(&path);
    let all = session.list_credentials().unwrap();
    assert_eq!(all[0].password, "hunter2-very-secret");
}

#[test]
fn listing_orders_by_updated_at_descending() {
    let (_dir, path) = vault_path("order");
    create(&path, &NewVault::new("order"));
    let mut session = open_unlocked(&path);

    let a = session.add_credential(&credential("A", "pa")).unwrap();
    tick();
    let b = session.add_credential(&credential("B", "pb")).unwrap();

    let ids: Vec<i64> = session.list_credentials().unwrap().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![b, a]);

    tick();
    let mut record = session.get_credential(a).unwrap();
    record.password = "pa2".into();
    session.update_credential(&record).unwrap();

    let listed = session.list_credentials().unwrap();
    let ids: Vec<i64> = listed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert!(listed[0].updated_at > listed[0].created_at);
    assert_eq!(listed[0].password, "pa2");
}

#[test]
fn update_never_rewrites_created_at() {
    let (_dir, path) = vault_path("created");
    create(&path, &NewVault::new("created"));
    let mut session = open_unlocked(&path);

    let id = session.add_credential(&credential("x", "p")).unwrap();
    let original = session.get_credential(id).unwrap();
    tick();

    let mut record = original.clone();
    record.name = "renamed".into();
    record.created_at = 1;
    session.update_credential(&record).unwrap();

    let after = session.get_credential(id).unwrap();
    assert_eq!(after.name, "renamed");
    assert_eq!(after.created_at, original.created_at);
}

#[test]
fn favorites_and_search_filter_listing() {
    let (_dir, path) = vault_path("filters");
    create(&path, &NewVault::new("filters"));
    let mut session = open_unlocked(&path);

    let gh = session.add_credential(&credential("GitHub", "p1")).unwrap();
    session.add_credential(&credential("GitLab", "p2")).unwrap();
    session.add_credential(&credential("Bank", "p3")).unwrap();
    session.toggle_favorite(gh, true).unwrap();

    let favorites = session
        .list_credentials_filtered(&CredentialFilter {
            favorites_only: true,
            search: None,
        })
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, gh);

    let git = session
        .list_credentials_filtered(&CredentialFilter {
            favorites_only: false,
            search: Some("git".into()),
        })
        .unwrap();
    assert_eq!(git.len(), 2);

    session.toggle_favorite(gh, false).unwrap();
    assert!(!session.get_credential(gh).unwrap().is_favorite);
}

#[test]
fn delete_credential_and_missing_ids() {
    let (_dir, path) = vault_path("delete");
    create(&path, &NewVault::new("delete"));
    let mut session = open_unlocked(&path);

    let id = session.add_credential(&credential("temp", "p")).unwrap();
    let record = session.get_credential(id).unwrap();
    session.delete_credential(&record).unwrap();

    assert!(session.list_credentials().unwrap().is_empty());
    assert!(matches!(
        session.get_credential(id),
        Err(VaultedError::CredentialNotFound(_))
    ));
    assert!(matches!(
        session.update_credential(&record),
        Err(VaultedError::CredentialNotFound(_))
    ));
    assert!(matches!(
        session.toggle_favorite(id, true),
        Err(VaultedError::CredentialNotFound(_))
    ));
}

#[test]
fn invalid_credential_is_rejected() {
    let (_dir, path) = vault_path("invalid");
    create(&path, &NewVault::new("invalid"));
    let mut session = open_unlocked(&path);

    assert!(matches!(
        session.add_credential(&credential("", "p")),
        Err(VaultedError::Validation(_))
    ));
    assert!(matches!(
        session.add_credential(&credential("name", "")),
        Err(VaultedError::Validation(_))
    ));
    assert!(session.list_credentials().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Metadata timestamps
// ---------------------------------------------------------------------------

#[test]
fn credential_mutations_stamp_metadata_when_tracking() {
    let (_dir, path) = vault_path("stamped");
    create(&path, &NewVault::new("stamped"));
    let mut session = open_unlocked(&path);

    let before = session.get_metadata().unwrap().updated_at.unwrap();
    tick();
    session.add_credential(&credential("a", "p")).unwrap();

    let stored = session.get_metadata().unwrap();
    let cached = session.cached_metadata().unwrap().clone();
    assert!(stored.updated_at.unwrap() > before);
    assert_eq!(stored, cached);
}

#[test]
fn work_vault_without_timestamps_stays_untracked() {
    let (_dir, path) = vault_path("work");
    let vault = NewVault {
        name: "work".into(),
        description: None,
        enable_timestamps: false,
    };
    create(&path, &vault);

    let mut session = open_unlocked(&path);
    assert_eq!(session.get_metadata().unwrap().created_at, None);

    let mut new = credential("github", "secret123");
    new.email = Some("me@x.com".into());
    new.description = Some(String::new());
    let id = session.add_credential(&new).unwrap();

    let m = session.get_metadata().unwrap();
    assert_eq!(m.updated_at, None);
    assert_eq!(m.created_at, None);

    let stored = session.get_credential(id).unwrap();
    assert_eq!(stored.description, None);
    assert!(stored.created_at > 0);
}

#[test]
fn update_metadata_works_locked_and_writes_through() {
    let (_dir, path) = vault_path("meta");
    create(&path, &NewVault::new("meta"));

    let mut session = VaultSession::open(&path).unwrap();
    let updated = session
        .update_metadata(&MetadataUpdate {
            description: Some("renamed while locked".into()),
            ..MetadataUpdate::default()
        })
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("renamed while locked"));

    session.unlock(PASSWORD).unwrap();
    let updated = session
        .update_metadata(&MetadataUpdate {
            name: Some("meta2".into()),
            enable_timestamps: Some(false),
            ..MetadataUpdate::default()
        })
        .unwrap();
    assert_eq!(session.cached_metadata(), Some(&updated));
    assert_eq!(session.get_metadata().unwrap(), updated);
    assert!(!updated.enable_timestamps);

    // Tracking is off now: credential writes no longer move updatedAt.
    let frozen = updated.updated_at;
    tick();
    session.add_credential(&credential("a", "p")).unwrap();
    assert_eq!(session.get_metadata().unwrap().updated_at, frozen);
}

#[test]
fn record_password_change_respects_tracking() {
    let (_dir, path) = vault_path("pwchange");
    create(&path, &NewVault::new("pwchange"));
    let mut session = VaultSession::open(&path).unwrap();

    let before = session.get_metadata().unwrap().last_password_change.unwrap();
    tick();
    session.record_password_change().unwrap();
    assert!(session.get_metadata().unwrap().last_password_change.unwrap() > before);

    let (_dir2, quiet) = vault_path("quiet");
    create(
        &quiet,
        &NewVault {
            name: "quiet".into(),
            description: None,
            enable_timestamps: false,
        },
    );
    let mut session = VaultSession::open(&quiet).unwrap();
    session.record_password_change().unwrap();
    assert_eq!(session.get_metadata().unwrap().last_password_change, None);
}

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

#[test]
fn change_password_reencrypts_everything() {
    let (_dir, path) = vault_path("rotate");
    create(&path, &NewVault::new("rotate"));
    let new_password = b"new-password-123";

    let mut session = open_unlocked(&path);
    session.add_credential(&credential("one", "p1")).unwrap();
    session.add_credential(&credential("two", "p2")).unwrap();

    assert!(matches!(
        session.change_password(b"wrong-current", new_password, &Argon2Params::minimum()),
        Err(VaultedError::WrongPassword)
    ));

    let before = session.get_metadata().unwrap().last_password_change;
    tick();
    session
        .change_password(PASSWORD, new_password, &Argon2Params::minimum())
        .unwrap();
    assert!(!session.is_locked());
    assert_eq!(session.list_credentials().unwrap().len(), 2);
    assert!(session.get_metadata().unwrap().last_password_change > before);
    session.close().unwrap();

    let mut reopened = VaultSession::open(&path).unwrap();
    assert!(matches!(
        reopened.unlock(PASSWORD),
        Err(VaultedError::WrongPassword)
    ));
    reopened.unlock(new_password).unwrap();
    let mut passwords: Vec<String> = reopened
        .list_credentials()
        .unwrap()
        .iter()
        .map(|c| c.password.clone())
        .collect();
    passwords.sort();
    assert_eq!(passwords, vec!["p1", "p2"]);
}

#[test]
fn change_password_requires_unlock() {
    let (_dir, path) = vault_path("rotlocked");
    create(&path, &NewVault::new("rotlocked"));

    let mut session = VaultSession::open(&path).unwrap();
    assert!(matches!(
        session.change_password(PASSWORD, b"new-password-123", &Argon2Params::minimum()),
        Err(VaultedError::Locked)
    ));
}

// ---------------------------------------------------------------------------
// Integrity, close, delete
// ---------------------------------------------------------------------------

#[test]
fn integrity_check_reports_healthy_and_broken_vaults() {
    let (_dir, path) = vault_path("healthy");
    create(&path, &NewVault::new("healthy"));

    let session = VaultSession::open(&path).unwrap();
    let report = session.integrity_check();
    assert!(report.ok, "{}", report.message);
    drop(session);

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("DELETE FROM metadata", []).unwrap();
    drop(conn);

    let session = VaultSession::open(&path).unwrap();
    let report = session.integrity_check();
    assert!(!report.ok);
    assert!(report.message.contains("metadata"));
    assert!(matches!(
        session.get_metadata(),
        Err(VaultedError::InvalidFormat(_))
    ));
}

#[test]
fn closed_session_rejects_operations() {
    let (_dir, path) = vault_path("closed");
    create(&path, &NewVault::new("closed"));

    let mut session = open_unlocked(&path);
    session.close().unwrap();
    session.close().unwrap();

    assert!(session.is_closed());
    assert!(session.is_locked());
    assert!(matches!(
        session.get_metadata(),
        Err(VaultedError::SessionClosed(_))
    ));
    assert!(matches!(
        session.list_credentials(),
        Err(VaultedError::SessionClosed(_))
    ));
    assert!(!session.integrity_check().ok);
}

#[test]
fn delete_vault_requires_close_then_removes_file() {
    let (dir, path) = vault_path("doomed");
    create(&path, &NewVault::new("doomed"));

    let mut session = VaultSession::open(&path).unwrap();
    assert!(matches!(
        session.delete_vault(),
        Err(VaultedError::StillOpen(_))
    ));

    session.close().unwrap();
    session.delete_vault().unwrap();

    assert!(!path.exists());
    assert!(list_vaults(dir.path().to_str().unwrap()).unwrap().is_empty());
    assert!(matches!(
        VaultSession::open(&path),
        Err(VaultedError::NotFound(_))
    ));
    assert!(matches!(
        session.delete_vault(),
        Err(VaultedError::NotFound(_))
    ));
}
