mod cli;
mod commands;
mod config;
mod logging;
mod server;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{AppConfig, DatabaseConfig};
use school_service::SchoolServiceModule;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let cfg = AppConfig::load(&cli.config)?;
    logging::init(&cfg.logging)?;

    let module = Arc::new(SchoolServiceModule::new(cfg.school_config()?));
    let db = connect(&cfg.database).await?;
    let command = cli.command.unwrap_or(Commands::Serve);

    let migrate = matches!(command, Commands::Migrate) || cfg.database.migrate_on_start;
    if migrate {
        module.migrate(&db).await?;
    }
    module.init(Arc::new(db));

    match command {
        Commands::Serve => server::run(module, &cfg.server).await,
        Commands::Migrate => Ok(()),
        Commands::CreateStaff(args) => commands::create_staff(&module, args).await,
        Commands::ImportStudents(args) => commands::import_students(&module, args).await,
        Commands::CheckAttendance { force } => commands::check_attendance(&module, force).await,
    }
}

async fn connect(cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(cfg.url.clone());
    options
        .max_connections(cfg.max_connections)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .with_context(|| format!("failed to connect to {}", cfg.url))?;
    tracing::info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}
