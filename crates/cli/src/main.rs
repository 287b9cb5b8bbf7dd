use std::path::PathBuf;

use anyhow::Context;
use bookshelf_app::Application;
use bookshelf_kernel::settings::{LoadOptions, Settings};
use clap::{Parser, Subcommand};

/// Book catalog API server and maintenance commands
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Environment overlay to load (local, staging, production)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Directory holding base.toml and <env>.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the documented routes and exit
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(LoadOptions {
        environment: cli.env,
        config_dir: cli.config_dir,
    })
    .with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, "bookshelf CLI starting");

    let app = Application::build(settings).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve(bookshelf_http::shutdown_signal()).await?,
        Command::Migrate => {
            let applied = app.migrate().await?;
            println!("applied {applied} migration(s)");
            app.stop().await?;
        }
        Command::Routes => {
            for line in bookshelf_http::route_table(app.registry()) {
                println!("{line}");
            }
            app.stop().await?;
        }
    }

    Ok(())
}
