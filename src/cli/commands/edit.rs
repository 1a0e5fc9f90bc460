//! `vaulted edit`: change a vault's name, description or timestamp
//! tracking. Metadata is not encrypted, so no password is needed.

use crate::cli::output;
use crate::cli::{vault_path, Cli, Toggle};
use crate::errors::Result;
use crate::vault::{MetadataUpdate, VaultSession};

/// Execute the `edit` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    new_name: Option<&str>,
    description: Option<&str>,
    timestamps: Option<Toggle>,
) -> Result<()> {
    let update = MetadataUpdate {
        name: new_name.map(str::to_string),
        description: description.map(str::to_string),
        enable_timestamps: timestamps.map(Toggle::enabled),
    };
    if update.name.is_none() && update.description.is_none() && update.enable_timestamps.is_none()
    {
        output::info("Nothing to change.");
        output::tip("Pass --name, --description or --timestamps.");
        return Ok(());
    }

    let path = vault_path(cli, name)?;
    let mut session = VaultSession::open(&path)?;
    let metadata = session.update_metadata(&update)?;
    session.close()?;

    output::success(&format!("Vault '{name}' updated"));
    output::print_vault_details(&metadata);
    if new_name.is_some() {
        output::tip(&format!(
            "The file is still {}; keep using '{name}' in commands.",
            path.display()
        ));
    }

    Ok(())
}
