use crate::{
    infras::{
        database::{Bootstrap, CreditPolicy},
        guards::*,
        session::{Session, SessionConfig},
    },
    pages::users::*,
    DbConn, IntoFlash,
};
use arsenal_db::{
    credits::CreditTransactions,
    error::ArsenalDbError,
    profiles::{ProfileForm, ProfileId},
};
use rocket::{
    form::Form,
    http::CookieJar,
    response::{Flash, Redirect},
    State,
};

#[derive(Debug, FromForm, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login", data = "<info>")]
pub async fn login(
    info: Form<LoginForm>,
    jar: &CookieJar<'_>,
    config: &State<SessionConfig>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let info = info.into_inner();
    let id = conn
        .run(move |c| ProfileId::login(c, &info.email, &info.password))
        .await
        .into_flash(uri!("/user", login_page))?;

    Session::new(id.get_id(), config)
        .store(jar, config)
        .into_flash(uri!("/user", login_page))?;
    Ok(Redirect::to(uri!("/user", portal)))
}

#[post("/register", data = "<info>")]
pub async fn register(
    info: Form<ProfileForm>,
    jar: &CookieJar<'_>,
    config: &State<SessionConfig>,
    bootstrap: &State<Bootstrap>,
    policy: &State<CreditPolicy>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let info = info.into_inner();
    let promote = bootstrap.is_admin_email(&info.email);
    let grant = policy.signup_grant;
    let id = conn
        .run(move |c| -> Result<ProfileId, ArsenalDbError> {
            let id = info.create(c)?;
            if promote {
                id.get_info(c)?.set_admin(true).update(c)?;
                log::info!("Registered bootstrap admin {}", id.get_id());
            }
            if grant > 0 {
                CreditTransactions::grant(c, &id, grant, "signup bonus")?;
            }
            Ok(id)
        })
        .await
        .into_flash(uri!("/user", register_page))?;

    Session::new(id.get_id(), config)
        .store(jar, config)
        .into_flash(uri!("/user", login_page))?;
    Ok(Redirect::to(uri!("/user", portal)))
}

#[get("/logout")]
pub async fn logout(jar: &CookieJar<'_>) -> Redirect {
    Session::clear(jar);
    // Redirect back to home
    Redirect::to(uri!("/"))
}

#[derive(Debug, FromForm, Clone)]
pub struct ProfileUpdateForm {
    pub username: String,
    #[field(default = String::new())]
    pub password: String,
}

#[post("/update", data = "<info>")]
pub async fn update_profile(
    user: ProfileInfoGuard<Cookie>,
    info: Form<ProfileUpdateForm>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let info = info.into_inner();
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        if info.username.trim().is_empty() {
            return Err(ArsenalDbError::MissingField("username"));
        }
        let mut profile = user.info.set_username(info.username.trim());
        // A blank password keeps the current one
        if !info.password.is_empty() {
            profile = profile.set_password(&info.password)?;
        }
        profile.update(c)
    })
    .await
    .into_flash(uri!("/user", portal))?;

    Ok(Redirect::to(uri!("/user", portal)))
}
