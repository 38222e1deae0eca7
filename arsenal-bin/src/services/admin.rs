use crate::{
    infras::guards::*,
    pages::admin::*,
    services::listings::StatusForm,
    table::Direction,
    DbConn, IntoFlash,
};
use arsenal_db::{
    credits::CreditTransactions,
    enums::EstablishmentKind,
    error::ArsenalDbError,
    establishments::{EstablishmentId, IncompleteEstablishment},
    events::EventId,
    listings::{ListingId, ListingInfo},
    posts::{PostId, PostInfo},
    profiles::{ProfileId, ProfileInfo},
};
use diesel::SqliteConnection;
use rocket::{
    form::Form,
    response::{Flash, Redirect},
};

// Mutations shared by the admin pages and the JSON API.
// Admins may not lock themselves out.

pub fn set_disabled(
    c: &mut SqliteConnection,
    me: &ProfileInfo,
    user_id: &str,
    disabled: Option<bool>,
) -> Result<ProfileInfo, ArsenalDbError> {
    if me.get_id() == user_id {
        return Err(ArsenalDbError::NotPermitted);
    }
    let info = ProfileId::find(c, user_id)?.get_info(c)?;
    let value = disabled.unwrap_or(!info.is_disabled());
    info.set_disabled(value).update(c)
}

pub fn set_verified(
    c: &mut SqliteConnection,
    user_id: &str,
    verified: Option<bool>,
) -> Result<ProfileInfo, ArsenalDbError> {
    let info = ProfileId::find(c, user_id)?.get_info(c)?;
    let value = verified.unwrap_or(!info.is_verified());
    info.set_verified(value).update(c)
}

pub fn update_roles(
    c: &mut SqliteConnection,
    me: &ProfileInfo,
    user_id: &str,
    is_admin: bool,
    is_seller: bool,
) -> Result<ProfileInfo, ArsenalDbError> {
    if me.get_id() == user_id && !is_admin {
        return Err(ArsenalDbError::NotPermitted);
    }
    ProfileId::find(c, user_id)?
        .get_info(c)?
        .set_admin(is_admin)
        .set_seller(is_seller)
        .update(c)
}

pub fn remove_user(
    c: &mut SqliteConnection,
    me: &ProfileInfo,
    user_id: &str,
) -> Result<usize, ArsenalDbError> {
    if me.get_id() == user_id {
        return Err(ArsenalDbError::NotPermitted);
    }
    ProfileId::find(c, user_id)?.delete(c)
}

pub fn create_owned_establishment(
    c: &mut SqliteConnection,
    owner_email: &str,
    form: IncompleteEstablishment,
) -> Result<EstablishmentId, ArsenalDbError> {
    let owner = ProfileId::find_by_email(c, owner_email)?;
    form.create(c, &owner)
}

pub fn set_featured(
    c: &mut SqliteConnection,
    listing_id: &str,
    featured: Option<bool>,
) -> Result<ListingInfo, ArsenalDbError> {
    let info = ListingId::find(c, listing_id)?.get_info(c)?;
    let value = featured.unwrap_or(!info.is_featured());
    info.set_featured(value).update(c)
}

pub fn set_published(
    c: &mut SqliteConnection,
    post_id: &str,
    published: Option<bool>,
) -> Result<PostInfo, ArsenalDbError> {
    let id = PostId::find(c, post_id)?;
    let value = match published {
        Some(v) => v,
        None => !id.get_info(c)?.is_published(),
    };
    id.set_published(c, value)
}

fn users_page() -> rocket::http::uri::Origin<'static> {
    uri!("/admin", users(_, _, _))
}

fn establishments_page() -> rocket::http::uri::Origin<'static> {
    uri!("/admin", establishments(_, _, _, _))
}

fn listings_page() -> rocket::http::uri::Origin<'static> {
    uri!("/admin", listings(_, _, _))
}

fn done(uri: rocket::http::uri::Origin<'static>, msg: &'static str) -> Flash<Redirect> {
    Flash::success(Redirect::to(uri), msg)
}

#[get("/users/disable?<user_id>")]
pub async fn toggle_disabled(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    user_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let updated = conn
        .run(move |c| set_disabled(c, &me.info, &user_id, None))
        .await
        .into_flash(users_page())?;
    Ok(done(
        users_page(),
        if updated.is_disabled() {
            "The account has been disabled"
        } else {
            "The account has been enabled"
        },
    ))
}

#[get("/users/verify?<user_id>")]
pub async fn toggle_verified(
    _role: Role<Admin>,
    user_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| set_verified(c, &user_id, None))
        .await
        .into_flash(users_page())?;
    Ok(done(users_page(), "Verification updated"))
}

#[derive(Debug, FromForm)]
pub struct RolesForm {
    #[field(default = false)]
    pub is_admin: bool,
    #[field(default = false)]
    pub is_seller: bool,
}

#[post("/users/roles?<user_id>", data = "<info>")]
pub async fn set_roles(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    user_id: String,
    info: Form<RolesForm>,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let (is_admin, is_seller) = (info.is_admin, info.is_seller);
    conn.run(move |c| update_roles(c, &me.info, &user_id, is_admin, is_seller))
        .await
        .into_flash(users_page())?;
    Ok(done(users_page(), "Roles updated"))
}

#[derive(Debug, FromForm)]
pub struct NotesForm {
    #[field(default = String::new())]
    pub notes: String,
}

// Blank notes clear the column
#[post("/users/notes?<user_id>", data = "<info>")]
pub async fn set_notes(
    _role: Role<Admin>,
    user_id: String,
    info: Form<NotesForm>,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let notes = info.into_inner().notes;
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        ProfileId::find(c, &user_id)?
            .get_info(c)?
            .set_notes(Some(notes))
            .update(c)
    })
    .await
    .into_flash(users_page())?;
    Ok(done(users_page(), "Notes saved"))
}

#[derive(Debug, FromForm)]
pub struct GrantForm {
    pub amount: i64,
    #[field(default = String::from("admin grant"))]
    pub reason: String,
}

#[post("/users/credits?<user_id>", data = "<info>")]
pub async fn grant_credits(
    _role: Role<Admin>,
    user_id: String,
    info: Form<GrantForm>,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let GrantForm { amount, reason } = info.into_inner();
    let balance = conn
        .run(move |c| -> Result<i64, ArsenalDbError> {
            let id = ProfileId::find(c, &user_id)?;
            CreditTransactions::grant(c, &id, amount, &reason)
        })
        .await
        .into_flash(users_page())?;
    Ok(Flash::success(
        Redirect::to(users_page()),
        format!("Credits granted, new balance {}", balance),
    ))
}

#[get("/users/delete?<user_id>")]
pub async fn delete_user(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    user_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| remove_user(c, &me.info, &user_id))
        .await
        .into_flash(users_page())?;
    Ok(done(users_page(), "The account has been deleted"))
}

#[derive(Debug, FromForm)]
pub struct AdminEstablishmentForm {
    pub owner_email: String,
    pub establishment: IncompleteEstablishment,
}

#[post("/establishments/new", data = "<info>")]
pub async fn create_establishment(
    _role: Role<Admin>,
    info: Form<AdminEstablishmentForm>,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let AdminEstablishmentForm {
        owner_email,
        establishment,
    } = info.into_inner();
    let back = format!("/admin/establishments?kind={}", establishment.kind.as_str());
    conn.run(move |c| create_owned_establishment(c, &owner_email, establishment))
        .await
        .into_flash(back.clone())?;
    Ok(Flash::success(
        Redirect::to(back),
        "The establishment has been created",
    ))
}

#[get("/establishments/delete?<establishment_id>")]
pub async fn delete_establishment(
    _role: Role<Admin>,
    establishment_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| EstablishmentId::find(c, &establishment_id)?.delete(c))
        .await
        .into_flash(establishments_page())?;
    Ok(done(establishments_page(), "The establishment has been deleted"))
}

#[get("/listings/feature?<listing_id>")]
pub async fn toggle_featured(
    _role: Role<Admin>,
    listing_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| set_featured(c, &listing_id, None))
        .await
        .into_flash(listings_page())?;
    Ok(done(listings_page(), "Listing updated"))
}

#[post("/listings/status?<listing_id>", data = "<info>")]
pub async fn set_listing_status(
    _role: Role<Admin>,
    listing_id: String,
    info: Form<StatusForm>,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let status = info.status;
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        ListingId::find(c, &listing_id)?
            .get_info(c)?
            .set_status(status)
            .update(c)
    })
    .await
    .into_flash(listings_page())?;
    Ok(done(listings_page(), "Listing updated"))
}

#[get("/listings/delete?<listing_id>")]
pub async fn delete_listing(
    _role: Role<Admin>,
    listing_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| ListingId::find(c, &listing_id)?.delete(c))
        .await
        .into_flash(listings_page())?;
    Ok(done(listings_page(), "The listing has been deleted"))
}

#[get("/events/delete?<event_id>")]
pub async fn delete_event(
    _role: Role<Admin>,
    event_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let back = uri!("/admin", events(_, _, _));
    conn.run(move |c| EventId::find(c, &event_id)?.delete(c))
        .await
        .into_flash(back.clone())?;
    Ok(done(back, "The event has been deleted"))
}

#[get("/posts/publish?<post_id>")]
pub async fn toggle_published(
    _role: Role<Admin>,
    post_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let back = uri!("/admin", posts(_, _, _));
    let post = conn
        .run(move |c| set_published(c, &post_id, None))
        .await
        .into_flash(back.clone())?;
    Ok(done(
        back,
        if post.is_published() {
            "The post has been published"
        } else {
            "The post has been unpublished"
        },
    ))
}

#[get("/posts/delete?<post_id>")]
pub async fn delete_post(
    _role: Role<Admin>,
    post_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let back = uri!("/admin", posts(_, _, _));
    conn.run(move |c| PostId::find(c, &post_id)?.delete(c))
        .await
        .into_flash(back.clone())?;
    Ok(done(back, "The post has been deleted"))
}
