use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use foodgram::catalog::loader;
use foodgram::config::{Cli, Command, Config};
use foodgram::db;
use foodgram::routes;
use foodgram::state::{AppState, DbPool};

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
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::LoadCatalog { file } => {
            let path = file.or_else(|| config.catalog.path.clone());
            load_catalog(&pool, path.as_deref())
        }
        Command::Serve => serve(pool, config).await,
    }
}

fn load_catalog(pool: &DbPool, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let report = loader::load_from(&mut conn, path)?;
    tracing::info!(
        ingredients = report.ingredients_added,
        tags = report.tags_added,
        "Catalog loaded"
    );
    Ok(())
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState { db: pool, config };
    let app = routes::router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
