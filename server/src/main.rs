//! vor-server: binds the vor-api router to a TCP listener.
//!
//! Configuration comes from the environment (a `.env` file is honoured); see `ServerConfig`.

use std::sync::Arc;
use tokio::net::TcpListener;
use vor_api::{app, ensure_database_exists, ensure_tables, AppState, ImgProxy, PgStore, S3Storage, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vor_api=info,vor_server=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    ensure_tables(&pool).await?;

    let storage = S3Storage::from_env(config.s3_bucket.clone(), config.s3_endpoint.as_deref()).await;
    let imgproxy = ImgProxy::new(
        &config.imgproxy_url,
        &config.imgproxy_key,
        &config.imgproxy_salt,
        &config.s3_bucket,
    )?;
    let store = PgStore::new(pool, Arc::new(storage));
    let state = AppState::from_store(store, imgproxy, config.upload_limit);

    if let Some(dir) = &config.frontend_dir {
        tracing::info!("serving frontend bundle from {}", dir.display());
    }
    let router = app(state, config.frontend_dir.clone());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("vor-server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
