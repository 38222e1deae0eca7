//! JSON endpoints under `/api`. Every failure is answered with `{"error": ...}`.
use crate::{
    infras::{
        basics::{api_error, ApiError, IntoApiError},
        guards::*,
    },
    services::admin,
    DbConn,
};
use arsenal_db::{
    credits::CreditTransactions,
    enums::EstablishmentKind,
    error::ArsenalDbError,
    establishments::{EstablishmentFinder, EstablishmentId, EstablishmentInfo, IncompleteEstablishment},
    listings::{ListingId, ListingInfo},
    posts::{PostId, PostInfo},
    profiles::{ProfileFinder, ProfileId, ProfileInfo},
    wishlist::{Wishlist, WishlistItem},
};
use rocket::{http::Status, serde::json::Json, Request};
use serde::{Deserialize, Serialize};

#[catch(default)]
pub fn api_catcher(status: Status, _request: &Request<'_>) -> ApiError {
    api_error(status, status.reason().unwrap_or("Unknown error"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Removed {
    pub removed: bool,
}

#[get("/admin/users")]
pub async fn list_users(
    _role: Role<Admin>,
    conn: DbConn,
) -> Result<Json<Vec<ProfileInfo>>, ApiError> {
    conn.run(|c| ProfileFinder::list_info(c))
        .await
        .map(Json)
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct DisableBody {
    pub disabled: bool,
}

#[patch("/users/<user_id>/disable", data = "<body>")]
pub async fn disable_user(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    user_id: String,
    body: Json<DisableBody>,
    conn: DbConn,
) -> Result<Json<ProfileInfo>, ApiError> {
    let disabled = body.disabled;
    conn.run(move |c| admin::set_disabled(c, &me.info, &user_id, Some(disabled)))
        .await
        .map(Json)
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub verified: bool,
}

#[patch("/users/<user_id>/verify", data = "<body>")]
pub async fn verify_user(
    _role: Role<Admin>,
    user_id: String,
    body: Json<VerifyBody>,
    conn: DbConn,
) -> Result<Json<ProfileInfo>, ApiError> {
    let verified = body.verified;
    conn.run(move |c| admin::set_verified(c, &user_id, Some(verified)))
        .await
        .map(Json)
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct RolesBody {
    pub is_admin: bool,
    pub is_seller: bool,
}

#[patch("/users/<user_id>/roles", data = "<body>")]
pub async fn set_roles(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    user_id: String,
    body: Json<RolesBody>,
    conn: DbConn,
) -> Result<Json<ProfileInfo>, ApiError> {
    let RolesBody {
        is_admin,
        is_seller,
    } = body.into_inner();
    conn.run(move |c| admin::update_roles(c, &me.info, &user_id, is_admin, is_seller))
        .await
        .map(Json)
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct GrantBody {
    pub amount: i64,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Balance {
    pub balance: i64,
}

#[post("/users/<user_id>/credits", data = "<body>")]
pub async fn grant_credits(
    _role: Role<Admin>,
    user_id: String,
    body: Json<GrantBody>,
    conn: DbConn,
) -> Result<Json<Balance>, ApiError> {
    let GrantBody { amount, reason } = body.into_inner();
    conn.run(move |c| -> Result<i64, ArsenalDbError> {
        let id = ProfileId::find(c, &user_id)?;
        CreditTransactions::grant(c, &id, amount, &reason)
    })
    .await
    .map(|balance| Json(Balance { balance }))
    .into_api()
}

#[get("/admin/establishments?<kind>")]
pub async fn list_establishments(
    _role: Role<Admin>,
    kind: Option<&str>,
    conn: DbConn,
) -> Result<Json<Vec<EstablishmentInfo>>, ApiError> {
    let kind = kind
        .map(|k| k.parse::<EstablishmentKind>())
        .transpose()
        .into_api()?;
    conn.run(move |c| {
        let mut finder = EstablishmentFinder::new(c, None);
        if let Some(kind) = kind {
            finder = finder.kind(kind);
        }
        finder.search_info()
    })
    .await
    .map(Json)
    .into_api()
}

#[derive(Debug, Deserialize)]
pub struct EstablishmentBody {
    pub owner_email: String,
    #[serde(flatten)]
    pub establishment: IncompleteEstablishment,
}

#[post("/admin/establishments", data = "<body>")]
pub async fn create_establishment(
    _role: Role<Admin>,
    body: Json<EstablishmentBody>,
    conn: DbConn,
) -> Result<(Status, Json<EstablishmentInfo>), ApiError> {
    let EstablishmentBody {
        owner_email,
        establishment,
    } = body.into_inner();
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        admin::create_owned_establishment(c, &owner_email, establishment)?.get_info(c)
    })
    .await
    .map(|info| (Status::Created, Json(info)))
    .into_api()
}

#[delete("/admin/establishments/<establishment_id>")]
pub async fn delete_establishment(
    _role: Role<Admin>,
    establishment_id: String,
    conn: DbConn,
) -> Result<Json<Removed>, ApiError> {
    conn.run(move |c| EstablishmentId::find(c, &establishment_id)?.delete(c))
        .await
        .map(|n| Json(Removed { removed: n > 0 }))
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    pub published: bool,
}

#[patch("/admin/posts/<post_id>/publish", data = "<body>")]
pub async fn publish_post(
    _role: Role<Admin>,
    post_id: String,
    body: Json<PublishBody>,
    conn: DbConn,
) -> Result<Json<PostInfo>, ApiError> {
    let published = body.published;
    conn.run(move |c| admin::set_published(c, &post_id, Some(published)))
        .await
        .map(Json)
        .into_api()
}

#[delete("/admin/posts/<post_id>")]
pub async fn delete_post(
    _role: Role<Admin>,
    post_id: String,
    conn: DbConn,
) -> Result<Json<Removed>, ApiError> {
    conn.run(move |c| PostId::find(c, &post_id)?.delete(c))
        .await
        .map(|n| Json(Removed { removed: n > 0 }))
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct FeatureBody {
    pub featured: bool,
}

#[patch("/admin/listings/<listing_id>/featured", data = "<body>")]
pub async fn feature_listing(
    _role: Role<Admin>,
    listing_id: String,
    body: Json<FeatureBody>,
    conn: DbConn,
) -> Result<Json<ListingInfo>, ApiError> {
    let featured = body.featured;
    conn.run(move |c| admin::set_featured(c, &listing_id, Some(featured)))
        .await
        .map(Json)
        .into_api()
}

#[get("/wishlist")]
pub async fn wishlist(
    user: ProfileIdGuard<Cookie>,
    conn: DbConn,
) -> Result<Json<Vec<ListingInfo>>, ApiError> {
    conn.run(move |c| Wishlist::listings(c, &user.id))
        .await
        .map(Json)
        .into_api()
}

#[derive(Debug, Deserialize)]
pub struct WishlistBody {
    pub listing_id: String,
}

#[post("/wishlist", data = "<body>")]
pub async fn add_to_wishlist(
    user: ProfileIdGuard<Cookie>,
    body: Json<WishlistBody>,
    conn: DbConn,
) -> Result<(Status, Json<WishlistItem>), ApiError> {
    let listing_id = body.into_inner().listing_id;
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?;
        Wishlist::add(c, &user.id, &listing)
    })
    .await
    .map(|item| (Status::Created, Json(item)))
    .into_api()
}

#[delete("/wishlist/<listing_id>")]
pub async fn remove_from_wishlist(
    user: ProfileIdGuard<Cookie>,
    listing_id: String,
    conn: DbConn,
) -> Result<Json<Removed>, ApiError> {
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?;
        Wishlist::remove(c, &user.id, &listing)
    })
    .await
    .map(|removed| Json(Removed { removed }))
    .into_api()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Wishlisted {
    pub wishlisted: bool,
}

#[get("/wishlist/check/<listing_id>")]
pub async fn check_wishlist(
    user: ProfileIdGuard<Cookie>,
    listing_id: String,
    conn: DbConn,
) -> Result<Json<Wishlisted>, ApiError> {
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?;
        Wishlist::contains(c, &user.id, &listing)
    })
    .await
    .map(|wishlisted| Json(Wishlisted { wishlisted }))
    .into_api()
}
