use rocket::http::Status;
use serde::Serialize;

use crate::error::AppError;

use super::{Permission, Role};

/// The authenticated principal, resolved from the session cookie on every request.
/// Hospital operators carry the unit they report for; administrators do not.
#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub hospital_id: Option<String>,
}

/// `users` row as read by sqlx. Columns come back nullable from joins.
#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub hospital_id: Option<String>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        let (Some(id), Some(username)) = (row.id, row.username) else {
            return Err(AppError::Internal("User row without id or username".to_string()));
        };

        let role = row
            .role
            .as_deref()
            .unwrap_or_default()
            .parse::<Role>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            id,
            username,
            role,
            hospital_id: row.hospital_id,
        })
    }
}

impl User {
    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.allows(permission) {
            return Ok(());
        }

        tracing::warn!(
            username = %self.username,
            role = %self.role,
            ?permission,
            "Role lacks permission for this page"
        );
        Err(Status::Forbidden)
    }
}
