//! `vaulted creds`: display the credentials of a vault.

use crate::cli::output;
use crate::cli::{open_unlocked, Cli};
use crate::errors::Result;
use crate::vault::CredentialFilter;

/// Execute the `creds` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    favorites: bool,
    search: Option<&str>,
    show: bool,
) -> Result<()> {
    let mut session = open_unlocked(cli, name)?;

    let filter = CredentialFilter {
        favorites_only: favorites,
        search: search.map(str::to_string),
    };
    let credentials = session.list_credentials_filtered(&filter)?;

    output::info(&format!("{name}: {} credential(s)", credentials.len()));
    output::print_credentials_table(&credentials, show);

    session.close()
}
