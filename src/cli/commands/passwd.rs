//! `vaulted passwd`: change a vault's password.
//!
//! Every credential is re-encrypted under a key derived from the new
//! password and a fresh salt, in one transaction.

use crate::cli::output;
use crate::cli::{prompt_new_password, prompt_password, settings, vault_path, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;
use crate::vault::VaultSession;

/// Execute the `passwd` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let path = vault_path(cli, name)?;
    let mut session = VaultSession::open(&path)?;

    // The current password is needed twice: to unlock, then to confirm
    // the change.
    output::info("Enter your current vault password.");
    let current = prompt_password()?;
    session.unlock(current.as_bytes())?;

    output::info("Choose your new vault password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;
    let settings = settings()?;

    session.change_password(
        current.as_bytes(),
        new_password.as_bytes(),
        &settings.argon2_params(),
    )?;
    let count = session.list_credentials()?.len();
    session.close()?;

    output::success(&format!(
        "Password changed for '{name}' ({count} credential(s) re-encrypted)"
    ));
    Ok(())
}
