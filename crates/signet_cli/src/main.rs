use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use signet_db::PgStore;
use signet_service::notify::LogSender;
use signet_service::ContractService;

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "signet")]
#[command(about = "Contract signature engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a draft contract from a PDF and a recipient list
    Create(commands::create::CreateArgs),

    /// Send a draft contract out for signature
    Send(commands::send::SendArgs),

    /// Show a contract's status and its recipients
    Status(commands::status::StatusArgs),

    /// Submit a signature on behalf of a recipient (testing aid)
    Sign(commands::sign::SignArgs),

    /// Download the signed document of a completed contract
    Download(commands::download::DownloadArgs),

    /// Print a contract's audit trail
    Audit(commands::audit::AuditArgs),

    /// Apply the database schema
    Rebuild(commands::rebuild::RebuildArgs),
}

async fn connect_service(config: &Config) -> anyhow::Result<ContractService> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    Ok(ContractService::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(LogSender),
        config.base_url.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Create(args) => {
            let service = connect_service(&config).await?;
            commands::create::execute(service, args).await?;
        }
        Commands::Send(args) => {
            let service = connect_service(&config).await?;
            commands::send::execute(service, args).await?;
        }
        Commands::Status(args) => {
            let service = connect_service(&config).await?;
            commands::status::execute(service, args).await?;
        }
        Commands::Sign(args) => {
            let service = connect_service(&config).await?;
            commands::sign::execute(service, args).await?;
        }
        Commands::Download(args) => {
            let service = connect_service(&config).await?;
            commands::download::execute(service, args).await?;
        }
        Commands::Audit(args) => {
            let service = connect_service(&config).await?;
            commands::audit::execute(service, args).await?;
        }
        Commands::Rebuild(args) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.database_url)
                .await?;
            commands::rebuild::execute(pool, args).await?;
        }
    }

    Ok(())
}
