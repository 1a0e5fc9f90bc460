//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::{expand_path, Settings};
use crate::errors::{Result, VaultedError};
use crate::vault::{vault_file_path, VaultSession};

/// Vaulted CLI: encrypted password vaults.
#[derive(Parser)]
#[command(name = "vaulted", about = "Encrypted password vaults", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding *.vault files (default: vaults-path from ~/.vaulted.toml)
    #[arg(long, global = true)]
    pub vaults_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List every vault in the vaults directory
    List,

    /// Create a new vault
    Create {
        /// Vault name (also the file name)
        name: String,
        /// Short description
        #[arg(short, long)]
        description: Option<String>,
        /// Do not track created/updated/password-change times
        #[arg(long)]
        no_timestamps: bool,
    },

    /// Show a vault's metadata
    Info {
        /// Vault name
        name: String,
    },

    /// Edit a vault's name, description or timestamp tracking
    Edit {
        /// Vault name
        name: String,
        /// New display name (the vault file is not renamed)
        #[arg(long = "name", value_name = "NAME")]
        new_name: Option<String>,
        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
        /// Turn timestamp tracking on or off
        #[arg(long, value_enum)]
        timestamps: Option<Toggle>,
    },

    /// Run a quick integrity check on a vault
    Check {
        /// Vault name
        name: String,
    },

    /// Delete a vault file
    Delete {
        /// Vault name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change a vault's password
    Passwd {
        /// Vault name
        name: String,
    },

    /// List the credentials in a vault
    Creds {
        /// Vault name
        name: String,
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
        /// Only show credentials whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Show passwords instead of masking them
        #[arg(long)]
        show: bool,
    },

    /// Add a credential (the password is prompted for)
    Add {
        /// Vault name
        name: String,
        /// Credential name, e.g. "GitHub"
        label: String,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },

    /// Update fields of a credential
    Update {
        /// Vault name
        name: String,
        /// Credential id (see `vaulted creds`)
        id: i64,
        /// New credential name
        #[arg(long)]
        label: Option<String>,
        /// New email (empty string clears it)
        #[arg(short, long)]
        email: Option<String>,
        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },

    /// Mark or unmark a credential as favorite
    Fav {
        /// Vault name
        name: String,
        /// Credential id
        id: i64,
        /// Remove the favorite mark instead
        #[arg(long)]
        off: bool,
    },

    /// Remove a credential
    Remove {
        /// Vault name
        name: String,
        /// Credential id
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// `on` / `off` switch for flags that take an explicit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Environment variable holding the vault password (CI/scripts).
pub const PASSWORD_ENV: &str = "VAULTED_PASSWORD";

/// Environment variable holding the new password for `passwd`.
pub const NEW_PASSWORD_ENV: &str = "VAULTED_NEW_PASSWORD";

/// Environment variable holding a credential's password for `add`/`update`.
pub const SECRET_ENV: &str = "VAULTED_SECRET";

/// Read a non-empty value from `var`, if set.
fn from_env(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

/// Get the vault password, from `VAULTED_PASSWORD` or an interactive prompt.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env(PASSWORD_ENV) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| VaultedError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new vault password with confirmation.
///
/// `env_var` is consulted first for scripted use. Length limits are
/// enforced by the vault layer.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env(env_var) {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Choose vault password")
        .with_confirmation("Confirm vault password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| VaultedError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Get a credential's password, from `VAULTED_SECRET` or a prompt.
pub fn prompt_secret(label: &str) -> Result<Zeroizing<String>> {
    if let Some(secret) = from_env(SECRET_ENV) {
        return Ok(secret);
    }

    let secret = dialoguer::Password::new()
        .with_prompt(format!("Password for '{label}'"))
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| VaultedError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(secret))
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultedError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Load `~/.vaulted.toml` (or defaults).
pub fn settings() -> Result<Settings> {
    Settings::load_default()
}

/// The vaults directory: `--vaults-dir` if given, else the configured one.
pub fn vaults_dir(cli: &Cli, settings: &Settings) -> PathBuf {
    match &cli.vaults_dir {
        Some(dir) => expand_path(dir),
        None => settings.vaults_dir(),
    }
}

/// Build the full path to the vault called `name`.
///
/// Example: `~/.vaults/personal.vault`
pub fn vault_path(cli: &Cli, name: &str) -> Result<PathBuf> {
    let settings = settings()?;
    vault_file_path(&vaults_dir(cli, &settings), name)
}

/// Open the vault called `name` and unlock it with the prompted password.
pub fn open_unlocked(cli: &Cli, name: &str) -> Result<VaultSession> {
    let path = vault_path(cli, name)?;
    let mut session = VaultSession::open(&path)?;
    let password = prompt_password()?;
    session.unlock(password.as_bytes())?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vaults_dir_flag_wins_over_settings() {
        let cli = Cli::parse_from(["vaulted", "--vaults-dir", "/tmp/v", "list"]);
        let settings = Settings {
            vaults_path: "/srv/vaults".into(),
            ..Settings::default()
        };
        assert_eq!(vaults_dir(&cli, &settings), PathBuf::from("/tmp/v"));

        let cli = Cli::parse_from(["vaulted", "list"]);
        assert_eq!(vaults_dir(&cli, &settings), PathBuf::from("/srv/vaults"));
    }

    #[test]
    fn edit_parses_timestamp_toggle() {
        let cli = Cli::parse_from(["vaulted", "edit", "work", "--timestamps", "off"]);
        match cli.command {
            Commands::Edit { timestamps, .. } => assert_eq!(timestamps, Some(Toggle::Off)),
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
