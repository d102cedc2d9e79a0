// src/main.rs

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use querydesk::config::CONFIG;
use querydesk::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting QueryDesk");
    info!("Model: {}", CONFIG.model);
    info!("Database: {}", CONFIG.database_url);

    // Chart artifacts land here; create it up front so the first
    // generate_plot call never races directory creation.
    std::fs::create_dir_all(&CONFIG.charts_dir)?;

    let app = server::router();

    let bind_address = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
