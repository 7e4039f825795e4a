use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use super::InfraError;

const MAX_CONNECTIONS: u32 = 10;

pub async fn init_db(database_url: &str) -> Result<PgPool, InfraError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(InfraError::Migration)?;

    info!("Database migrations applied");
    Ok(pool)
}
