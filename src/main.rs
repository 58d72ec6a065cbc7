#[macro_use]
extern crate rocket;

mod audit;
mod auth;
mod backup;
mod checklist;
mod constants;
mod database;
mod db;
mod env;
mod error;
mod models;
mod reporting;
mod routes;
mod scheduler;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use auth::{forbidden, unauthorized};
use database::init_database;
use env::{Settings, load_environment};
use error::AppError;
use rocket::fairing::AdHoc;
use rocket::tokio::sync::Mutex;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use routes::{
    dashboard, hospital_trends, hospital_trends_filtered, login, logout, logs,
    manual_backup, process_login, statistics, statistics_filtered, submit_checklist,
};
use scheduler::BackgroundJobs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Environment(String),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    load_environment().map_err(|e| Error::Environment(e.to_string()))?;
    init_tracing();

    let settings = Settings::from_env()?;
    info!(
        database = %settings.database_path.display(),
        backup_dir = %settings.backup_dir.display(),
        "Loaded settings"
    );

    let options = SqliteConnectOptions::new()
        .filename(&settings.database_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_database(&pool).await?;

    let jobs = BackgroundJobs::start(pool.clone(), &settings).await?;

    let _ = init_rocket(pool, settings)
        .await
        .manage(Mutex::new(jobs))
        .launch()
        .await?;

    Ok(())
}

pub async fn init_rocket(pool: SqlitePool, settings: Settings) -> Rocket<Build> {
    info!("Starting hospital checklist");

    rocket::build()
        .manage(pool)
        .manage(settings)
        .mount(
            "/",
            routes![
                login,
                process_login,
                logout,
                routes::checklist,
                submit_checklist,
                dashboard,
                statistics,
                statistics_filtered,
                hospital_trends,
                hospital_trends_filtered,
                logs,
                manual_backup,
            ],
        )
        .register("/", catchers![unauthorized, forbidden])
        .attach(Template::fairing())
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Background jobs", |rocket| {
            Box::pin(async move {
                if let Some(jobs) = rocket.state::<Mutex<BackgroundJobs>>() {
                    if let Err(e) = jobs.lock().await.shutdown().await {
                        e.log_and_record("Stopping background jobs");
                    }
                }
                shutdown_telemetry();
            })
        }))
}
