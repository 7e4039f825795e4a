pub mod app;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod http_client;
pub mod pending_sweeper;
pub mod setup;
pub mod status_client;
pub mod webhook_signature;
pub mod wompi_client;

pub use error::InfraError;

use crate::adapters::persistence::PostgresPersistence;

pub async fn postgres_persistence(database_url: &str) -> Result<PostgresPersistence, InfraError> {
    let pool = db::init_db(database_url).await?;
    Ok(PostgresPersistence::new(pool))
}
