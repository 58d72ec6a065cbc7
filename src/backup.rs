use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rocket::tokio;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tracing::{info, instrument};

use crate::error::AppError;

/// Name of the snapshot file taken at `at`: `<stem>_<YYYY-MM-DD_HH-MM-SS>.<ext>`.
pub fn snapshot_file_name(database_path: &Path, at: NaiveDateTime) -> String {
    let stem = database_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("database");
    let timestamp = at.format("%Y-%m-%d_%H-%M-%S");

    match database_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, timestamp, ext),
        None => format!("{}_{}", stem, timestamp),
    }
}

/// Writes a full copy of the live database into `backup_dir`, creating the directory
/// when needed. Uses `VACUUM INTO` over a dedicated connection, which reads a
/// consistent snapshot without blocking other connections.
#[instrument]
pub async fn backup_database(database_path: &Path, backup_dir: &Path) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(backup_dir).await?;

    let target = backup_dir.join(snapshot_file_name(
        database_path,
        Local::now().naive_local(),
    ));
    if tokio::fs::try_exists(&target).await? {
        return Err(AppError::Backup(format!(
            "Snapshot {} already exists",
            target.display()
        )));
    }

    let target_str = target
        .to_str()
        .ok_or_else(|| AppError::Backup(format!("Non UTF-8 backup path: {}", target.display())))?
        .to_string();

    let mut conn = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(false)
        .connect()
        .await?;

    let result = sqlx::query("VACUUM INTO ?")
        .bind(&target_str)
        .execute(&mut conn)
        .await;
    conn.close().await?;
    result?;

    info!(path = %target.display(), "Database backed up");
    Ok(target)
}
