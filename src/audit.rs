use chrono::Local;
use rocket::Request;
use rocket::request::{FromRequest, Outcome};
use sqlx::{Pool, Sqlite};
use tracing::{error, instrument};

use crate::db::insert_log;

/// Address of the client that issued the request, when Rocket knows it.
#[derive(Debug, Clone, Default)]
pub struct ClientAddress(pub Option<String>);

impl ClientAddress {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientAddress {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(ClientAddress(request.client_ip().map(|ip| ip.to_string())))
    }
}

pub fn now_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Appends an audit entry. Failures are reported and swallowed so that auditing never
/// changes the outcome of the request that triggered it.
#[instrument(skip(pool, client))]
pub async fn log_action(
    pool: &Pool<Sqlite>,
    user_id: Option<i64>,
    action: &str,
    client: &ClientAddress,
) {
    if let Err(e) = insert_log(pool, user_id, action, &now_timestamp(), client.as_deref()).await {
        error!(error = %e, action = %action, "Failed to write audit log entry");
    }
}
