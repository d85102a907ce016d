use std::env;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use signet_api::routes::app_router;
use signet_api::AppState;
use signet_db::PgStore;
use signet_service::notify::LogSender;
use signet_service::ContractService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")?;
    let base_url =
        env::var("SIGNET_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let bind_addr = env::var("SIGNET_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    let service = ContractService::new(Arc::new(PgStore::new(pool)), Arc::new(LogSender), base_url);

    let app = app_router(AppState { service });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
