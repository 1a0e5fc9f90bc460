//! `vaulted info`: show a vault's metadata. No password needed.

use crate::cli::output;
use crate::cli::{vault_path, Cli};
use crate::errors::Result;
use crate::vault::VaultSession;

/// Execute the `info` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let path = vault_path(cli, name)?;
    let mut session = VaultSession::open(&path)?;

    let metadata = session.get_metadata()?;
    output::print_vault_details(&metadata);

    session.close()
}
