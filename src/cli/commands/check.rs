//! `vaulted check`: run a quick integrity check on a vault.

use crate::cli::output;
use crate::cli::{vault_path, Cli};
use crate::errors::{Result, VaultedError};
use crate::vault::VaultSession;

/// Execute the `check` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let path = vault_path(cli, name)?;
    let mut session = VaultSession::open(&path)?;

    let report = session.integrity_check();
    session.close()?;

    if report.ok {
        output::success(&report.message);
        Ok(())
    } else {
        Err(VaultedError::CommandFailed(format!(
            "integrity check failed for '{name}': {}",
            report.message
        )))
    }
}
