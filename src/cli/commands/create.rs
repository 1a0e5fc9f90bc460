//! `vaulted create`: create a new, empty vault.

use crate::cli::output;
use crate::cli::{prompt_new_password, settings, vault_path, Cli, PASSWORD_ENV};
use crate::errors::{Result, VaultedError};
use crate::vault::{NewVault, VaultSession};

/// Execute the `create` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    description: Option<&str>,
    no_timestamps: bool,
) -> Result<()> {
    let settings = settings()?;
    let path = vault_path(cli, name)?;

    if path.exists() {
        output::tip(&format!("Use `vaulted info {name}` to inspect the existing vault."));
        return Err(VaultedError::AlreadyExists(path));
    }

    let vault = NewVault {
        name: name.to_string(),
        description: description.map(str::to_string),
        enable_timestamps: !no_timestamps,
    };
    vault.validate()?;

    let password = prompt_new_password(PASSWORD_ENV)?;
    VaultSession::create(&path, &vault, password.as_bytes(), &settings.argon2_params())?;

    output::success(&format!("Vault '{name}' created at {}", path.display()));
    if no_timestamps {
        output::info("Timestamp tracking is off for this vault.");
    }
    output::tip(&format!("Run `vaulted add {name} <NAME>` to add a credential."));

    Ok(())
}
