mod handlers;
mod routings;
mod trace;

pub use crate::routings::router;
pub use crate::trace::TraceId;

use app_config::{AppConfig, StorageKind};
use app_data::{MemoryStore, PgStore};
use app_error::AppError;
use app_log::init_tracing;
use app_schema::customer::Customer;
use app_state::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::*;

pub async fn web_service() -> Result<(), AppError> {
    let config = AppConfig::new()?;
    let bind = config.backend_bind.clone();
    init_tracing(config.log_level);
    // Loading Routes
    let routes = match config.storage {
        StorageKind::Postgres => {
            let database_url = AppConfig::database_url()?;
            let pg = PgPoolOptions::new()
                .max_connections(config.pg_connection)
                .connect(&database_url)
                .await?;
            sqlx::raw_sql(Customer::create_table()).execute(&pg).await?;
            info!("PostgreSQL schema is ready");
            router(Arc::new(AppState::new(config, PgStore::new(pg))))
        }
        StorageKind::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            let store = MemoryStore::<Customer>::new();
            router(Arc::new(AppState::new(config, store)))
        }
    };
    // Setup TCP Port
    let tcp_listener = tokio::net::TcpListener::bind(&bind).await?;
    // Running Server ...
    info!("Serving web server on {}", &bind);
    axum::serve(tcp_listener, routes).await?;
    Ok(())
}
