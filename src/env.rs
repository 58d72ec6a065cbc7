use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_DATABASE_PATH: &str = "hospital_checklist.db";
pub const DEFAULT_BACKUP_FOLDER: &str = "BACKUP_BD";
/// Every day at 02:00 local time (seconds, minutes, hours, ...).
pub const DEFAULT_BACKUP_SCHEDULE: &str = "0 0 2 * * *";
pub const DEFAULT_SESSION_HOURS: i64 = 8;

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Application settings that live outside Rocket's own figment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_schedule: String,
    pub session_hours: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_FOLDER),
            backup_schedule: DEFAULT_BACKUP_SCHEDULE.to_string(),
            session_hours: DEFAULT_SESSION_HOURS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Settings::default();

        let session_hours = match dotenvy::var("SESSION_HOURS") {
            Ok(raw) => raw.trim().parse::<i64>().ok().filter(|h| *h > 0).ok_or_else(|| {
                AppError::Validation(format!("SESSION_HOURS must be a positive integer, got '{}'", raw))
            })?,
            Err(_) => defaults.session_hours,
        };

        Ok(Self {
            database_path: dotenvy::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            backup_dir: dotenvy::var("BACKUP_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            backup_schedule: dotenvy::var("BACKUP_SCHEDULE").unwrap_or(defaults.backup_schedule),
            session_hours,
        })
    }
}
