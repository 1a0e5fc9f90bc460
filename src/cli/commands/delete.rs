//! `vaulted delete`: remove a vault file.

use crate::cli::output;
use crate::cli::{confirm, vault_path, Cli};
use crate::errors::Result;
use crate::vault::VaultSession;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let path = vault_path(cli, name)?;

    // Opening first proves the file is a vault and nobody else holds it.
    let mut session = VaultSession::open(&path)?;

    if !force && !confirm(&format!("Delete vault '{name}' and all its credentials?"))? {
        output::warning("Cancelled.");
        return Ok(());
    }

    session.close()?;
    session.delete_vault()?;

    output::success(&format!("Deleted vault '{name}'"));
    Ok(())
}
