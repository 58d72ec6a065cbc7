use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use thiserror::Error;
use tracing::{Span, error, field, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Checklist encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Value recorded as `error.type` on the active span.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Authentication(_) => "authentication_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::Validation(_) => "validation_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Backup(_) => "backup_error",
            AppError::Scheduler(_) => "scheduler_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Faults of the server rather than of the caller's input.
    pub fn is_server_fault(&self) -> bool {
        !matches!(
            self,
            AppError::Authentication(_) | AppError::NotFound(_) | AppError::Validation(_)
        )
    }

    pub fn log_and_record(&self, ctx: &str) {
        let kind = self.kind();
        let message = self.to_string();

        if self.is_server_fault() {
            error!(error = %message, error_kind = kind, context = %ctx, "Operation failed");
        } else {
            warn!(error = %message, error_kind = kind, context = %ctx, "Request rejected");
        }

        let span = Span::current();
        if span.is_none() {
            return;
        }

        span.record("error", field::display(true));
        span.record(ERROR_TYPE, field::display(kind));
        span.record("error.message", field::display(&message));
        if self.is_server_fault() {
            span.record(OTEL_STATUS_CODE, field::display("ERROR"));
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Authentication(_) => Status::Unauthorized,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Validation(_) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        self.log_and_record(&format!("{} {}", req.method(), req.uri()));
        self.status_code().respond_to(req)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password hashing failed: {}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Backup(format!("I/O error: {}", error))
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for AppError {
    fn from(error: tokio_cron_scheduler::JobSchedulerError) -> Self {
        AppError::Scheduler(error.to_string())
    }
}
