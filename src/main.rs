use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use driftpost::auth::session;
use driftpost::config::{Cli, Command, Config};
use driftpost::state::{AppState, DbPool};
use driftpost::{db, routes, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let db_path = config.db_path();
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    tracing::info!("Database: {}", db_path.display());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Seed => {
            let conn = pool.get()?;
            seed::run(&conn, &config.auth, &mut rand::thread_rng())?;
            tracing::info!("Seeded accounts share the password {:?}", seed::DEMO_PASSWORD);
            Ok(())
        }
        Command::Serve => serve(pool, config).await,
    }
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    let purged = session::purge_expired(&*pool.get()?)?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions and verifications", purged);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::app(AppState::new(pool, config));

    tracing::info!("Driftpost listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
