//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Local};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{Credential, VaultMetadata};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Render a millisecond timestamp in local time, or `Hidden` when the
/// vault does not track it.
pub fn format_timestamp(millis: Option<i64>) -> String {
    match millis.and_then(DateTime::from_timestamp_millis) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Hidden".to_string(),
    }
}

/// Print a table of vaults (Name, Description, Updated, File).
pub fn print_vaults_table(vaults: &[VaultMetadata]) {
    if vaults.is_empty() {
        info("No vaults found.");
        tip("Run `vaulted create <NAME>` to create your first vault.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Description", "Updated", "File"]);

    for v in vaults {
        table.add_row(vec![
            v.name.clone(),
            v.description.clone().unwrap_or_default(),
            format_timestamp(v.updated_at),
            v.file_path.display().to_string(),
        ]);
    }

    println!("{table}");
}

/// Print every metadata field of one vault.
pub fn print_vault_details(metadata: &VaultMetadata) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let tracking = if metadata.enable_timestamps { "on" } else { "off" };
    table.add_row(vec!["Name".to_string(), metadata.name.clone()]);
    table.add_row(vec![
        "Description".to_string(),
        metadata.description.clone().unwrap_or_default(),
    ]);
    table.add_row(vec!["Created".to_string(), format_timestamp(metadata.created_at)]);
    table.add_row(vec!["Updated".to_string(), format_timestamp(metadata.updated_at)]);
    table.add_row(vec![
        "Password changed".to_string(),
        format_timestamp(metadata.last_password_change),
    ]);
    table.add_row(vec!["Timestamps".to_string(), tracking.to_string()]);
    table.add_row(vec![
        "File".to_string(),
        metadata.file_path.display().to_string(),
    ]);

    println!("{table}");
}

/// Print a table of credentials. Passwords are masked unless `reveal`.
pub fn print_credentials_table(credentials: &[Credential], reveal: bool) {
    if credentials.is_empty() {
        info("No credentials found.");
        tip("Run `vaulted add <VAULT> <NAME>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "", "Name", "Email", "Password", "Description", "Updated"]);

    for c in credentials {
        let favorite = if c.is_favorite {
            style("\u{2605}").yellow().to_string()
        } else {
            String::new()
        };
        let password = if reveal {
            c.password.clone()
        } else {
            "\u{2022}".repeat(8)
        };
        table.add_row(vec![
            c.id.to_string(),
            favorite,
            c.name.clone(),
            c.email.clone().unwrap_or_default(),
            password,
            c.description.clone().unwrap_or_default(),
            format_timestamp(Some(c.updated_at)),
        ]);
    }

    println!("{table}");
}
