use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaulted::cli::commands;
use vaulted::cli::{Cli, Commands};

fn main() {
    // Diagnostics go to stderr, filtered by VAULTED_LOG (e.g. "vaulted=debug").
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VAULTED_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => commands::list::execute(&cli),
        Commands::Create {
            ref name,
            ref description,
            no_timestamps,
        } => commands::create::execute(&cli, name, description.as_deref(), no_timestamps),
        Commands::Info { ref name } => commands::info::execute(&cli, name),
        Commands::Edit {
            ref name,
            ref new_name,
            ref description,
            timestamps,
        } => commands::edit::execute(
            &cli,
            name,
            new_name.as_deref(),
            description.as_deref(),
            timestamps,
        ),
        Commands::Check { ref name } => commands::check::execute(&cli, name),
        Commands::Delete { ref name, force } => commands::delete::execute(&cli, name, force),
        Commands::Passwd { ref name } => commands::passwd::execute(&cli, name),
        Commands::Creds {
            ref name,
            favorites,
            ref search,
            show,
        } => commands::creds::execute(&cli, name, favorites, search.as_deref(), show),
        Commands::Add {
            ref name,
            ref label,
            ref email,
            ref description,
            favorite,
        } => commands::add::execute(
            &cli,
            name,
            label,
            email.as_deref(),
            description.as_deref(),
            favorite,
        ),
        Commands::Update {
            ref name,
            id,
            ref label,
            ref email,
            ref description,
            password,
        } => {
            let changes = commands::update::Changes {
                label: label.as_deref(),
                email: email.as_deref(),
                description: description.as_deref(),
                password,
            };
            commands::update::execute(&cli, name, id, &changes)
        }
        Commands::Fav { ref name, id, off } => commands::fav::execute(&cli, name, id, off),
        Commands::Remove {
            ref name,
            id,
            force,
        } => commands::remove::execute(&cli, name, id, force),
    };

    if let Err(e) = result {
        vaulted::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
