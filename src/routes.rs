use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate, Utc};
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::{Responder, State};
use rocket_dyn_templates::{Template, context};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::audit::{ClientAddress, log_action, now_timestamp};
use crate::auth::{AdminUser, HospitalUser, SESSION_COOKIE, User, UserSession};
use crate::backup::backup_database;
use crate::checklist::ChecklistData;
use crate::constants::{CHECKLIST, HOSPITALS, Hospital, OBSERVATION_KEYWORDS, hospital_by_id};
use crate::db::{
    authenticate_user, create_user_session, get_latest_report, get_recent_logs, get_report,
    get_reports_between, invalidate_session, submit_report,
};
use crate::env::Settings;
use crate::error::AppError;
use crate::models::{NewReport, SubmitOutcome};
use crate::reporting::{
    ChecklistView, DateRange, FORTNIGHT_DAYS, STATISTICS_DEFAULT_DAYS, TRENDS_DEFAULT_DAYS,
    TrendsView, build_dashboard, build_statistics, build_trends, format_date, resolve_range,
};
use crate::validation::{first_validation_message, validate_goal};

pub const LOGIN_FAILED_MESSAGE: &str = "Usuario o contraseña incorrectos.";
pub const REPORT_SAVED_MESSAGE: &str = "¡Reporte guardado exitosamente!";
pub const BACKUP_SUCCESS_MESSAGE: &str = "Respaldo de la base de datos creado exitosamente.";
pub const AUDIT_LOG_LIMIT: i64 = 100;

/// A flash message in a shape templates can read.
#[derive(Debug, Clone, Serialize)]
pub struct FlashView {
    pub kind: String,
    pub message: String,
}

impl From<FlashMessage<'_>> for FlashView {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        }
    }
}

impl FlashView {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: "warning".to_string(),
            message: message.into(),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(FromForm, Validate)]
pub struct LoginForm {
    #[field(default = String::new())]
    #[validate(length(min = 1, message = "El usuario es obligatorio."))]
    username: String,
    #[field(default = String::new())]
    #[validate(length(min = 1, message = "La contraseña es obligatoria."))]
    password: String,
}

#[get("/")]
pub fn login(flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "login",
        context! {
            title: "Iniciar sesión",
            flash: flash.map(FlashView::from),
            hospitals: HOSPITALS,
            current_route: "login",
        },
    )
}

#[post("/", data = "<form>")]
pub async fn process_login(
    form: Form<LoginForm>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
    client: ClientAddress,
) -> Result<Redirect, Flash<Redirect>> {
    info!("Login attempt: {}", &form.username);

    if let Err(errors) = form.validate() {
        warn!(reason = %first_validation_message(&errors), "Rejected login form");
        log_action(
            db,
            None,
            &format!("failed login attempt for username: {}", form.username),
            &client,
        )
        .await;
        return Err(Flash::error(Redirect::to("/"), LOGIN_FAILED_MESSAGE));
    }

    let user = match authenticate_user(db, &form.username, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            e.log_and_record("Login");
            None
        }
    };

    let Some(user) = user else {
        log_action(
            db,
            None,
            &format!("failed login attempt for username: {}", form.username),
            &client,
        )
        .await;
        return Err(Flash::error(Redirect::to("/"), LOGIN_FAILED_MESSAGE));
    };

    let token = UserSession::generate_token();
    let expires_at = Utc::now() + Duration::hours(settings.session_hours);

    if let Err(e) = create_user_session(db, user.id, &token, expires_at.naive_utc()).await {
        e.log_and_record("Creating session");
        return Err(Flash::error(
            Redirect::to("/"),
            format!("No se pudo iniciar la sesión: {}", e),
        ));
    }

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(settings.session_hours)),
    );

    info!("Authentication successful for {}", &user.username);
    log_action(db, Some(user.id), "successful login", &client).await;

    Ok(Redirect::to(user.role.home()))
}

#[get("/logout")]
pub async fn logout(
    user: Option<User>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Redirect {
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE) {
        if let Err(e) = invalidate_session(db, cookie.value()).await {
            e.log_and_record("Logout");
        }
    }
    cookies.remove_private(Cookie::build(SESSION_COOKIE));

    if let Some(user) = user {
        log_action(db, Some(user.id), "logout", &client).await;
    }

    Redirect::to("/")
}

fn render_checklist(view: &ChecklistView, flash: Option<FlashView>, user: &User) -> Template {
    Template::render(
        "checklist",
        context! {
            title: "Checklist diario",
            view: view,
            flash: flash,
            current_user: user,
            current_route: "checklist",
        },
    )
}

#[get("/checklist")]
pub async fn checklist(
    hospital: HospitalUser,
    flash: Option<FlashMessage<'_>>,
    db: &State<Pool<Sqlite>>,
) -> Result<Template, AppError> {
    let today = format_date(today());
    let report = get_report(db, &hospital.hospital_id, &today).await?;
    let view = ChecklistView::build(&hospital.hospital_id, &today, report.as_ref(), CHECKLIST);

    Ok(render_checklist(
        &view,
        flash.map(FlashView::from),
        &hospital.user,
    ))
}

#[derive(FromForm, Debug)]
pub struct ChecklistForm {
    #[field(default = HashMap::new())]
    checklist: HashMap<String, String>,
    observations: Option<String>,
    met_goal: Option<String>,
    operations_performed: Option<String>,
}

#[derive(Responder)]
pub enum ChecklistResponse {
    Saved(Flash<Redirect>),
    Rejected(Template),
}

#[post("/checklist", data = "<form>")]
pub async fn submit_checklist(
    hospital: HospitalUser,
    form: Form<ChecklistForm>,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<ChecklistResponse, AppError> {
    let hospital_id = hospital.hospital_id.as_str();
    let user_id = hospital.user.id;
    let today = format_date(today());

    let goal = match validate_goal(form.met_goal.as_deref(), form.operations_performed.as_deref())
    {
        Ok(goal) => goal,
        Err(rejection) => {
            warn!(hospital_id = %hospital_id, reason = %rejection, "Checklist submission rejected");
            let stored = get_report(db, hospital_id, &today).await?;
            let view = ChecklistView::build(hospital_id, &today, stored.as_ref(), CHECKLIST);
            return Ok(ChecklistResponse::Rejected(render_checklist(
                &view,
                Some(FlashView::error(rejection.to_string())),
                &hospital.user,
            )));
        }
    };

    let report = NewReport {
        hospital_id: hospital_id.to_string(),
        date: today.clone(),
        checklist_data: ChecklistData::from_form(CHECKLIST, &form.checklist),
        observations: form.observations.clone().unwrap_or_default(),
        met_goal: goal.met_goal,
        operations_performed: goal.operations_performed,
        submitted_by: user_id,
    };

    match submit_report(db, &report, &now_timestamp()).await {
        Ok(outcome) => {
            let action = match outcome {
                SubmitOutcome::Created(_) => {
                    format!("submitted daily report for {} on {}", hospital_id, today)
                }
                SubmitOutcome::Updated(_) => {
                    format!("updated daily report for {} on {}", hospital_id, today)
                }
            };
            info!(report_id = outcome.report_id(), hospital_id = %hospital_id, "Daily report saved");
            log_action(db, Some(user_id), &action, &client).await;

            Ok(ChecklistResponse::Saved(Flash::success(
                Redirect::to("/checklist"),
                REPORT_SAVED_MESSAGE,
            )))
        }
        Err(e) => {
            e.log_and_record("Saving daily report");
            log_action(
                db,
                Some(user_id),
                &format!(
                    "error saving report for {} on {}: {}",
                    hospital_id, today, e
                ),
                &client,
            )
            .await;

            Ok(ChecklistResponse::Saved(Flash::error(
                Redirect::to("/checklist"),
                format!("Error al guardar el reporte: {}. Intente de nuevo.", e),
            )))
        }
    }
}

#[get("/dashboard")]
pub async fn dashboard(
    admin: AdminUser,
    flash: Option<FlashMessage<'_>>,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    let AdminUser(user) = admin;
    log_action(db, Some(user.id), "accessed dashboard", &client).await;

    let today = today();
    let window = DateRange::last_days(today, FORTNIGHT_DAYS);
    let reports = get_reports_between(db, &window.start_str(), &window.end_str(), None).await?;

    let mut latest = HashMap::new();
    for hospital in HOSPITALS {
        if let Some(report) = get_latest_report(db, hospital.id).await? {
            latest.insert(hospital.id.to_string(), report);
        }
    }

    let view = build_dashboard(today, HOSPITALS, CHECKLIST, &reports, &latest);

    Ok(Template::render(
        "dashboard",
        context! {
            title: "Tablero",
            view: view,
            flash: flash.map(FlashView::from),
            current_user: user,
            current_route: "dashboard",
        },
    ))
}

/// Date range and optional hospital picked on the statistics and trends pages.
#[derive(FromForm, Debug, Default, Clone)]
pub struct RangeFilter {
    start_date: Option<String>,
    end_date: Option<String>,
    hospital_id: Option<String>,
}

impl RangeFilter {
    fn hospital(&self) -> Option<&'static Hospital> {
        self.hospital_id.as_deref().and_then(hospital_by_id)
    }
}

async fn render_statistics(
    user: User,
    filter: RangeFilter,
    db: &Pool<Sqlite>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    log_action(db, Some(user.id), "accessed statistics page", &client).await;

    let resolved = resolve_range(
        filter.start_date.as_deref(),
        filter.end_date.as_deref(),
        today(),
        STATISTICS_DEFAULT_DAYS,
    );
    let range = resolved.range;
    let hospital = filter.hospital().map(|h| h.id);

    let reports = get_reports_between(db, &range.start_str(), &range.end_str(), hospital).await?;
    let view = build_statistics(&reports, HOSPITALS, CHECKLIST);

    Ok(Template::render(
        "statistics",
        context! {
            title: "Estadísticas",
            view: view,
            start_date: range.start_str(),
            end_date: range.end_str(),
            selected_hospital_id: hospital,
            hospitals: HOSPITALS,
            flash: resolved.warning.map(FlashView::warning),
            current_user: user,
            current_route: "statistics",
        },
    ))
}

#[get("/statistics?<filter..>")]
pub async fn statistics(
    admin: AdminUser,
    filter: RangeFilter,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    render_statistics(admin.0, filter, db, client).await
}

#[post("/statistics", data = "<filter>")]
pub async fn statistics_filtered(
    admin: AdminUser,
    filter: Form<RangeFilter>,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    render_statistics(admin.0, filter.into_inner(), db, client).await
}

async fn render_trends(
    user: User,
    filter: RangeFilter,
    db: &Pool<Sqlite>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    log_action(db, Some(user.id), "accessed hospital trends page", &client).await;

    let resolved = resolve_range(
        filter.start_date.as_deref(),
        filter.end_date.as_deref(),
        today(),
        TRENDS_DEFAULT_DAYS,
    );
    let range = resolved.range;
    let hospital = filter.hospital();

    let view = match hospital {
        Some(hospital) => {
            let reports =
                get_reports_between(db, &range.start_str(), &range.end_str(), Some(hospital.id))
                    .await?;
            build_trends(&reports, CHECKLIST, OBSERVATION_KEYWORDS)
        }
        None => TrendsView::default(),
    };

    Ok(Template::render(
        "hospital_trends",
        context! {
            title: "Tendencias por hospital",
            view: view,
            start_date: range.start_str(),
            end_date: range.end_str(),
            selected_hospital_id: hospital.map(|h| h.id),
            selected_hospital_name: hospital.map(|h| h.name).unwrap_or("Seleccione un Hospital"),
            hospitals: HOSPITALS,
            flash: resolved.warning.map(FlashView::warning),
            current_user: user,
            current_route: "hospital_trends",
        },
    ))
}

#[get("/hospital_trends?<filter..>")]
pub async fn hospital_trends(
    admin: AdminUser,
    filter: RangeFilter,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    render_trends(admin.0, filter, db, client).await
}

#[post("/hospital_trends", data = "<filter>")]
pub async fn hospital_trends_filtered(
    admin: AdminUser,
    filter: Form<RangeFilter>,
    db: &State<Pool<Sqlite>>,
    client: ClientAddress,
) -> Result<Template, AppError> {
    render_trends(admin.0, filter.into_inner(), db, client).await
}

#[get("/logs")]
pub async fn logs(admin: AdminUser, db: &State<Pool<Sqlite>>) -> Result<Template, AppError> {
    let entries = get_recent_logs(db, AUDIT_LOG_LIMIT).await?;

    Ok(Template::render(
        "logs",
        context! {
            title: "Bitácora",
            logs: entries,
            current_user: admin.0,
            current_route: "logs",
        },
    ))
}

#[get("/backup_bd")]
pub async fn manual_backup(
    admin: AdminUser,
    db: &State<Pool<Sqlite>>,
    settings: &State<Settings>,
    client: ClientAddress,
) -> Flash<Redirect> {
    let AdminUser(user) = admin;

    match backup_database(&settings.database_path, &settings.backup_dir).await {
        Ok(path) => {
            info!(path = %path.display(), username = %user.username, "Manual backup created");
            log_action(db, Some(user.id), "manual database backup triggered", &client).await;
            Flash::success(Redirect::to("/dashboard"), BACKUP_SUCCESS_MESSAGE)
        }
        Err(e) => {
            e.log_and_record("Manual backup");
            log_action(
                db,
                Some(user.id),
                &format!("manual database backup failed: {}", e),
                &client,
            )
            .await;
            Flash::error(
                Redirect::to("/dashboard"),
                format!("Error al crear el respaldo: {}", e),
            )
        }
    }
}
