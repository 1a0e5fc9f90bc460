//! `vaulted list`: display every vault in the vaults directory.

use crate::cli::output;
use crate::cli::{settings, vaults_dir, Cli};
use crate::errors::Result;
use crate::vault::list_vaults_at;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = settings()?;
    let dir = vaults_dir(cli, &settings);

    let vaults = list_vaults_at(&dir)?;
    if !vaults.is_empty() {
        output::info(&format!("{} vault(s) in {}", vaults.len(), dir.display()));
    }
    output::print_vaults_table(&vaults);

    Ok(())
}
