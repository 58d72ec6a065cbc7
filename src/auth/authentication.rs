use rocket::Request;
use rocket::outcome::try_outcome;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::{Flash, Redirect};
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::db::{get_session_by_token, get_user};

use super::{Permission, SESSION_COOKIE, User};

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        authenticate(request)
            .instrument(tracing::info_span!("user_auth_guard"))
            .await
    }
}

async fn authenticate(request: &Request<'_>) -> Outcome<User, ()> {
    let Some(cookie) = request.cookies().get_private(SESSION_COOKIE) else {
        return Outcome::Error((Status::Unauthorized, ()));
    };

    let Some(pool) = request.rocket().state::<SqlitePool>() else {
        tracing::error!("No SqlitePool in managed state");
        return Outcome::Error((Status::InternalServerError, ()));
    };

    let session = match get_session_by_token(pool, cookie.value()).await {
        Ok(session) if session.is_valid() => session,
        Ok(session) => {
            tracing::info!(user_id = session.user_id, "Session expired, login required");
            return Outcome::Error((Status::Unauthorized, ()));
        }
        Err(err) => {
            tracing::warn!(error = %err, "Session cookie does not match a stored session");
            return Outcome::Error((Status::Unauthorized, ()));
        }
    };

    match get_user(pool, session.user_id).await {
        Ok(user) => {
            tracing::debug!(username = %user.username, role = %user.role, "Session resolved");
            Outcome::Success(user)
        }
        Err(err) => {
            tracing::error!(user_id = session.user_id, error = %err, "Session points at a missing user");
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// A logged in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<User>().await);

        match user.require_permission(Permission::Administer) {
            Ok(()) => Outcome::Success(AdminUser(user)),
            Err(status) => Outcome::Error((status, ())),
        }
    }
}

/// A logged in hospital operator together with the unit it reports for.
#[derive(Debug, Clone)]
pub struct HospitalUser {
    pub user: User,
    pub hospital_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for HospitalUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<User>().await);

        if let Err(status) = user.require_permission(Permission::SubmitChecklist) {
            return Outcome::Error((status, ()));
        }

        match user.hospital_id.clone() {
            Some(hospital_id) => Outcome::Success(HospitalUser { user, hospital_id }),
            None => {
                tracing::warn!(username = %user.username, "Hospital user without a hospital id");
                Outcome::Error((Status::Forbidden, ()))
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Flash<Redirect> {
    tracing::info!(path = %req.uri(), "Login required");
    Flash::error(Redirect::to("/"), "Por favor, inicie sesión.")
}

#[catch(403)]
pub fn forbidden(req: &Request) -> Redirect {
    tracing::warn!(path = %req.uri(), "Page outside the user's role");
    Redirect::to("/")
}
