use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::db::create_user;
use crate::error::AppError;

pub struct SeedUser {
    pub username: &'static str,
    pub password: &'static str,
    pub role: Role,
    pub hospital_id: Option<&'static str>,
}

/// Accounts created on first boot: one administrator and one operator per unit.
pub const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        username: "admin",
        password: "admin123",
        role: Role::Admin,
        hospital_id: None,
    },
    SeedUser {
        username: "hgz24",
        password: "pass24",
        role: Role::Hospital,
        hospital_id: Some("hgz24"),
    },
    SeedUser {
        username: "hgz27",
        password: "pass27",
        role: Role::Hospital,
        hospital_id: Some("hgz27"),
    },
    SeedUser {
        username: "hgz29",
        password: "pass29",
        role: Role::Hospital,
        hospital_id: Some("hgz29"),
    },
    SeedUser {
        username: "hgz48",
        password: "pass48",
        role: Role::Hospital,
        hospital_id: Some("hgz48"),
    },
    SeedUser {
        username: "gineco3a",
        password: "pass3a",
        role: Role::Hospital,
        hospital_id: Some("gineco3a"),
    },
];

/// Inserts the seed accounts when the users table is empty. Returns how many users
/// were created.
#[instrument(skip_all)]
pub async fn seed_users(pool: &Pool<Sqlite>, users: &[SeedUser]) -> Result<usize, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(0);
    }

    for user in users {
        create_user(pool, user.username, user.password, user.role, user.hospital_id).await?;
    }

    info!(count = users.len(), "Seeded initial users");
    Ok(users.len())
}
