use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_backend::api::router;
use todo_backend::config::Config;
use todo_backend::repository::SqliteTodoRepository;
use todo_backend::state::AppState;
use todo_backend::storage::S3AttachmentStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "todo_backend=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.auth.issuer.is_some() || config.auth.audience.is_some() {
        info!(
            issuer = ?config.auth.issuer,
            audience = ?config.auth.audience,
            "bearer tokens are expected to be verified upstream"
        );
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let todos = SqliteTodoRepository::new(pool, &config.todos_table)?;
    todos.init_schema().await?;

    let attachments = S3AttachmentStore::from_config(&config.storage)?;
    info!(bucket = %config.storage.bucket, "attachment store ready");

    let state = AppState::new(Arc::new(todos), Arc::new(attachments));
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
