//! `vaulted update`: change fields of an existing credential.

use crate::cli::output;
use crate::cli::{open_unlocked, prompt_secret, Cli};
use crate::errors::Result;
use crate::vault::validate;

/// Field changes requested on the command line. `None` keeps the
/// current value; an empty email or description clears it.
pub struct Changes<'a> {
    pub label: Option<&'a str>,
    pub email: Option<&'a str>,
    pub description: Option<&'a str>,
    pub password: bool,
}

impl Changes<'_> {
    fn is_empty(&self) -> bool {
        self.label.is_none() && self.email.is_none() && self.description.is_none() && !self.password
    }
}

/// Execute the `update` command.
pub fn execute(cli: &Cli, name: &str, id: i64, changes: &Changes<'_>) -> Result<()> {
    if changes.is_empty() {
        output::info("Nothing to change.");
        output::tip("Pass --label, --email, --description or --password.");
        return Ok(());
    }

    let mut session = open_unlocked(cli, name)?;
    let mut record = session.get_credential(id)?;

    if let Some(label) = changes.label {
        record.name = label.to_string();
    }
    if let Some(email) = changes.email {
        record.email = validate::non_empty(Some(email));
    }
    if let Some(description) = changes.description {
        record.description = validate::non_empty(Some(description));
    }
    if changes.password {
        let secret = prompt_secret(&record.name)?;
        record.password = secret.as_str().to_string();
    }

    session.update_credential(&record)?;
    session.close()?;

    output::success(&format!("Updated '{}' (id {id})", record.name));
    Ok(())
}
