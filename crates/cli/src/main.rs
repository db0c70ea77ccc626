use std::path::PathBuf;

use anyhow::Context;
use bookstore_app::Application;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookstore catalog service
#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    /// Directory holding `base.toml` and the environment overlays
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (local, staging, production)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve HTTP until interrupted (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the merged OpenAPI document as JSON
    Openapi,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        Settings::load_with(self.config_dir.as_deref(), self.env.as_deref())
            .with_context(|| "failed to load bookstore settings")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Serve => {
            let settings = cli.settings()?;
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(
                env = ?settings.environment,
                bind = %settings.server.bind_address(),
                "bookstore starting"
            );
            Application::build(settings).await?.serve().await
        }
        Command::Migrate => {
            let settings = cli.settings()?;
            bookstore_telemetry::init(&settings.telemetry)?;
            let report = Application::build(settings).await?.migrate().await?;

            for key in &report.applied {
                println!("applied {key}");
            }
            for key in &report.skipped {
                println!("skipped {key}");
            }
            Ok(())
        }
        Command::Openapi => {
            // No telemetry here: stdout carries the document only.
            let registry = bookstore_app::modules::registry()?;
            let document = bookstore_http::router::build_openapi(&registry);
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
    }
}
