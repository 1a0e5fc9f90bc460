//! `vaulted add`: add a credential to a vault.

use crate::cli::output;
use crate::cli::{open_unlocked, prompt_secret, Cli};
use crate::errors::Result;
use crate::vault::NewCredential;

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    label: &str,
    email: Option<&str>,
    description: Option<&str>,
    favorite: bool,
) -> Result<()> {
    let mut session = open_unlocked(cli, name)?;
    let secret = prompt_secret(label)?;

    let mut credential = NewCredential::new(label, secret.as_str());
    credential.email = email.map(str::to_string);
    credential.description = description.map(str::to_string);
    credential.is_favorite = favorite;

    let id = session.add_credential(&credential)?;
    session.close()?;

    output::success(&format!("Added '{label}' to '{name}' (id {id})"));
    Ok(())
}
