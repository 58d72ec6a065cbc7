use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use rocket::serde::Serialize;

/// Capabilities checked by the request guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Submit the daily checklist of the user's own hospital.
    SubmitChecklist,
    /// Every admin page: dashboard, statistics, trends, audit log and backups.
    Administer,
}

/// Stored lowercase in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hospital,
}

// Hospital operators only report; administrators only read and back up.
static HOSPITAL_GRANTS: Lazy<HashSet<Permission>> =
    Lazy::new(|| HashSet::from([Permission::SubmitChecklist]));

static ADMIN_GRANTS: Lazy<HashSet<Permission>> =
    Lazy::new(|| HashSet::from([Permission::Administer]));

impl Role {
    pub fn grants(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Admin => &ADMIN_GRANTS,
            Role::Hospital => &HOSPITAL_GRANTS,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.grants().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hospital => "hospital",
        }
    }

    /// Where a freshly logged in user lands.
    pub fn home(&self) -> &'static str {
        match self {
            Role::Admin => "/dashboard",
            Role::Hospital => "/checklist",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "hospital" => Ok(Role::Hospital),
            other => Err(anyhow!("Unrecognised role '{}' in users table", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
