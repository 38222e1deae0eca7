use crate::{
    infras::session::{Session, SessionConfig},
    DbConn,
};
use arsenal_db::{
    error::ArsenalDbError,
    profiles::{ProfileId, ProfileInfo},
};
use chrono::Utc;
use rocket::{
    http::Status,
    outcome::{try_outcome, Outcome},
    request::FromRequest,
    Request,
};
use std::marker::PhantomData;

// Profile resolved from the session cookie
pub struct Cookie;

/// Set when the session belonged to a disabled account, read by the 403 catchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAccount(pub bool);

// What the session cookie of a request resolved to. Computed once per request.
enum SessionState {
    Anonymous,
    Disabled,
    Active(ProfileInfo),
}

async fn resolve_session(request: &Request<'_>) -> SessionState {
    let jar = request.cookies();
    let session = match Session::load(jar) {
        Some(s) => s,
        None => return SessionState::Anonymous,
    };
    let now = Utc::now().timestamp();
    if session.is_expired(now) {
        Session::clear(jar);
        return SessionState::Anonymous;
    }

    let db = match request.guard::<DbConn>().await.succeeded() {
        Some(db) => db,
        None => {
            log::error!("No database connection available for session lookup");
            return SessionState::Anonymous;
        }
    };
    let uid = session.uid.clone();
    // Disabled status is re-checked against the row on every request
    let info = db
        .run(move |c| -> Result<ProfileInfo, ArsenalDbError> {
            ProfileId::find(c, &uid)?.get_info(c)
        })
        .await;

    match info {
        Ok(info) if info.is_disabled() => {
            Session::clear(jar);
            request.local_cache(|| DisabledAccount(true));
            SessionState::Disabled
        }
        Ok(info) => {
            if session.needs_refresh(now) {
                if let Some(config) = request.rocket().state::<SessionConfig>() {
                    if let Err(e) = Session::new(info.get_id(), config).store(jar, config) {
                        log::error!("Failed to refresh session: {}", e);
                    }
                }
            }
            SessionState::Active(info)
        }
        Err(e) => {
            if !e.is_not_found() {
                log::error!("Failed to load the profile of a session: {}", e);
            }
            Session::clear(jar);
            SessionState::Anonymous
        }
    }
}

// This request guard gets us the signed in profile.
// Anonymous requests are forwarded with 401, disabled accounts fail with 403.
pub struct ProfileInfoGuard<T> {
    pub info: ProfileInfo,
    plhdr: PhantomData<T>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProfileInfoGuard<Cookie> {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> rocket::request::Outcome<Self, Self::Error> {
        match request.local_cache_async(resolve_session(request)).await {
            SessionState::Active(info) => Outcome::Success(ProfileInfoGuard {
                info: info.clone(),
                plhdr: PhantomData,
            }),
            SessionState::Disabled => Outcome::Error((Status::Forbidden, ())),
            SessionState::Anonymous => Outcome::Forward(Status::Unauthorized),
        }
    }
}

pub struct ProfileIdGuard<T> {
    pub id: ProfileId,
    plhdr: PhantomData<T>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProfileIdGuard<Cookie> {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> rocket::request::Outcome<Self, Self::Error> {
        let profile = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);
        Outcome::Success(ProfileIdGuard {
            id: profile.info.to_id(),
            plhdr: PhantomData,
        })
    }
}
