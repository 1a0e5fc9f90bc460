//! `vaulted fav`: mark or unmark a credential as favorite.

use crate::cli::output;
use crate::cli::{open_unlocked, Cli};
use crate::errors::Result;

/// Execute the `fav` command.
pub fn execute(cli: &Cli, name: &str, id: i64, off: bool) -> Result<()> {
    let mut session = open_unlocked(cli, name)?;
    session.toggle_favorite(id, !off)?;
    session.close()?;

    if off {
        output::success(&format!("Credential {id} is no longer a favorite"));
    } else {
        output::success(&format!("Credential {id} marked as favorite"));
    }
    Ok(())
}
