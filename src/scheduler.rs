use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use sqlx::{Pool, Sqlite};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use crate::backup::backup_database;
use crate::db::clean_expired_sessions;
use crate::env::Settings;
use crate::error::AppError;

/// Top of every hour.
pub const SESSION_CLEANUP_SCHEDULE: &str = "0 0 * * * *";

/// Handle to the background jobs. Kept in Rocket's managed state for the lifetime
/// of the process.
pub struct BackgroundJobs {
    scheduler: JobScheduler,
    pub backup_job: Uuid,
    pub session_cleanup_job: Uuid,
}

struct BackupTarget {
    database_path: PathBuf,
    backup_dir: PathBuf,
}

pub fn backup_job(settings: &Settings) -> Result<Job, AppError> {
    let target = Arc::new(BackupTarget {
        database_path: settings.database_path.clone(),
        backup_dir: settings.backup_dir.clone(),
    });

    let job = Job::new_async_tz(settings.backup_schedule.as_str(), Local, move |_uuid, _lock| {
        let target = Arc::clone(&target);
        Box::pin(async move {
            info!(event = "job_started", job_name = "database_backup", "Starting scheduled backup");
            match backup_database(&target.database_path, &target.backup_dir).await {
                Ok(path) => {
                    info!(event = "job_finished", job_name = "database_backup", path = %path.display(), "Scheduled backup finished")
                }
                Err(e) => {
                    error!(event = "job_failed", job_name = "database_backup", error = %e, "Scheduled backup failed")
                }
            }
        })
    })?;

    Ok(job)
}

pub fn session_cleanup_job(pool: Pool<Sqlite>) -> Result<Job, AppError> {
    let job = Job::new_async(SESSION_CLEANUP_SCHEDULE, move |_uuid, _lock| {
        let pool = pool.clone();
        Box::pin(async move {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }
        })
    })?;

    Ok(job)
}

impl BackgroundJobs {
    pub async fn start(pool: Pool<Sqlite>, settings: &Settings) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new().await?;

        let backup_job = scheduler.add(backup_job(settings)?).await?;
        let session_cleanup_job = scheduler.add(session_cleanup_job(pool)?).await?;

        scheduler.start().await?;
        info!(
            schedule = %settings.backup_schedule,
            backup_dir = %settings.backup_dir.display(),
            "Daily database backup scheduled"
        );

        Ok(Self {
            scheduler,
            backup_job,
            session_cleanup_job,
        })
    }

    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}
