use crate::{
    auth::{DbUser, DbUserSession, Role, User, UserSession},
    error::AppError,
    models::{DbLogEntry, DbReport, LogEntry, NewReport, Report, SubmitOutcome},
};
use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite, Transaction};
use tracing::{info, instrument, warn};

#[cfg(not(test))]
const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const PASSWORD_COST: u32 = 4;

const REPORT_COLUMNS: &str = "id, hospital_id, date, checklist_data, observations, met_goal, \
     operations_performed, submitted_by, submitted_at";

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, hospital_id FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => User::try_from(user),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_user_by_username(pool: &Pool<Sqlite>, username: &str) -> Result<User, AppError> {
    info!("Getting user by username");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, role, hospital_id FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(db_user) => User::try_from(db_user),
        _ => Err(AppError::NotFound(format!(
            "User with username {} not found in database",
            username
        ))),
    }
}

/// Checks a username/password pair, returning the user when the credentials match.
#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let row: Option<(String,)> = sqlx::query_as("SELECT password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some((hash,)) = row else {
        return Ok(None);
    };

    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(Some(get_user_by_username(pool, username).await?)),
        _ => Ok(None),
    }
}

#[instrument(skip_all, fields(username, role))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
    role: Role,
    hospital_id: Option<&str>,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing_user: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let hashed_password = bcrypt::hash(password, PASSWORD_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, password, role, hospital_id) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(role.as_str())
    .bind(hospital_id)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[instrument(skip(pool))]
pub async fn get_report(
    pool: &Pool<Sqlite>,
    hospital_id: &str,
    date: &str,
) -> Result<Option<Report>, AppError> {
    let row = sqlx::query_as::<_, DbReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports WHERE hospital_id = ? AND date = ?"
    ))
    .bind(hospital_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(Report::try_from).transpose()
}

/// Reports dated within `start..=end`, oldest first and ordered by hospital within a
/// day. Dates are ISO strings so the range comparison is lexical.
#[instrument(skip(pool))]
pub async fn get_reports_between(
    pool: &Pool<Sqlite>,
    start: &str,
    end: &str,
    hospital_id: Option<&str>,
) -> Result<Vec<Report>, AppError> {
    info!("Getting reports in date range");
    let rows = match hospital_id {
        Some(hospital_id) => {
            sqlx::query_as::<_, DbReport>(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE hospital_id = ? AND date BETWEEN ? AND ?
                 ORDER BY date ASC, hospital_id ASC"
            ))
            .bind(hospital_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbReport>(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE date BETWEEN ? AND ?
                 ORDER BY date ASC, hospital_id ASC"
            ))
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(Report::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_latest_report(
    pool: &Pool<Sqlite>,
    hospital_id: &str,
) -> Result<Option<Report>, AppError> {
    let row = sqlx::query_as::<_, DbReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reports
         WHERE hospital_id = ?
         ORDER BY date DESC
         LIMIT 1"
    ))
    .bind(hospital_id)
    .fetch_optional(pool)
    .await?;

    row.map(Report::try_from).transpose()
}

/// Stores the report for a hospital and day, replacing the content of an existing
/// submission. Runs in a single transaction that is rolled back on any failure.
#[instrument(skip(pool, report), fields(hospital_id = %report.hospital_id, date = %report.date))]
pub async fn submit_report(
    pool: &Pool<Sqlite>,
    report: &NewReport,
    submitted_at: &str,
) -> Result<SubmitOutcome, AppError> {
    info!("Submitting daily report");
    let checklist_json = report.checklist_data.to_json()?;

    let mut tx = pool.begin().await?;

    match write_report(&mut tx, report, &checklist_json, submitted_at).await {
        Ok(outcome) => {
            tx.commit().await?;
            Ok(outcome)
        }
        Err(e) => {
            // The write error is what the operator needs to see, even if the rollback fails too.
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, write_error = %e, "Rollback of failed report write failed");
            }
            Err(e)
        }
    }
}

async fn write_report(
    tx: &mut Transaction<'_, Sqlite>,
    report: &NewReport,
    checklist_json: &str,
    submitted_at: &str,
) -> Result<SubmitOutcome, AppError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM reports WHERE hospital_id = ? AND date = ?")
            .bind(&report.hospital_id)
            .bind(&report.date)
            .fetch_optional(&mut **tx)
            .await?;

    if let Some((id,)) = existing {
        sqlx::query(
            "UPDATE reports
             SET checklist_data = ?, observations = ?, met_goal = ?, operations_performed = ?, submitted_at = ?
             WHERE id = ?",
        )
        .bind(checklist_json)
        .bind(&report.observations)
        .bind(report.met_goal)
        .bind(report.operations_performed)
        .bind(submitted_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        return Ok(SubmitOutcome::Updated(id));
    }

    let res = sqlx::query(
        "INSERT INTO reports
         (hospital_id, date, checklist_data, observations, met_goal, operations_performed, submitted_by, submitted_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.hospital_id)
    .bind(&report.date)
    .bind(checklist_json)
    .bind(&report.observations)
    .bind(report.met_goal)
    .bind(report.operations_performed)
    .bind(report.submitted_by)
    .bind(submitted_at)
    .execute(&mut **tx)
    .await?;

    Ok(SubmitOutcome::Created(res.last_insert_rowid()))
}

#[instrument(skip(pool, action))]
pub async fn insert_log(
    pool: &Pool<Sqlite>,
    user_id: Option<i64>,
    action: &str,
    timestamp: &str,
    ip_address: Option<&str>,
) -> Result<i64, AppError> {
    let res = sqlx::query(
        "INSERT INTO logs (user_id, action, timestamp, ip_address) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(timestamp)
    .bind(ip_address)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Most recent audit entries, newest first.
#[instrument(skip(pool))]
pub async fn get_recent_logs(pool: &Pool<Sqlite>, limit: i64) -> Result<Vec<LogEntry>, AppError> {
    info!("Getting recent audit log entries");
    let rows = sqlx::query_as::<_, DbLogEntry>(
        "SELECT l.id, u.username, l.action, l.timestamp, l.ip_address
         FROM logs l
         LEFT JOIN users u ON l.user_id = u.id
         ORDER BY l.timestamp DESC, l.id DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(LogEntry::from).collect())
}
