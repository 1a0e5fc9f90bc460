//! `vaulted remove`: delete a credential from a vault.

use crate::cli::output;
use crate::cli::{confirm, open_unlocked, Cli};
use crate::errors::Result;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, id: i64, force: bool) -> Result<()> {
    let mut session = open_unlocked(cli, name)?;
    let record = session.get_credential(id)?;

    if !force && !confirm(&format!("Remove credential '{}'?", record.name))? {
        output::warning("Cancelled.");
        return Ok(());
    }

    session.delete_credential(&record)?;
    session.close()?;

    output::success(&format!("Removed '{}' from '{name}'", record.name));
    Ok(())
}
