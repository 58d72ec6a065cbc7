pub mod schema;
pub mod seed;

pub use schema::*;
pub use seed::*;

use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

/// Creates any missing tables and seeds the initial accounts.
#[instrument(skip_all)]
pub async fn init_database(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Applying database schema");
    sqlx::raw_sql(CURRENT_SCHEMA).execute(pool).await?;

    seed_users(pool, SEED_USERS).await?;
    Ok(())
}
