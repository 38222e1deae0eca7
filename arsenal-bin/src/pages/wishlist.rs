use crate::{
    infras::{
        basics::{Dollars, Msg},
        guards::*,
    },
    DbConn, IntoFlash,
};
use arsenal_db::{listings::ListingInfo, wishlist::Wishlist};
use askama::Template;
use chrono::Utc;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};

pub struct Saved {
    pub listing: ListingInfo,
    pub visible: bool,
}

#[derive(Template)]
#[template(path = "wishlist.html")]
pub struct WishlistPage {
    inner: Msg,
    listings: Vec<Saved>,
}

// Saved listings that are no longer visible stay on the list, greyed out
#[get("/")]
pub async fn wishlist_page(
    user: ProfileIdGuard<Cookie>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<WishlistPage, Flash<Redirect>> {
    let listings = conn
        .run(move |c| Wishlist::listings(c, &user.id))
        .await
        .into_flash(uri!("/"))?;
    let now = Utc::now().naive_utc();
    Ok(WishlistPage {
        inner: Msg::from_flash(flash),
        listings: listings
            .into_iter()
            .map(|listing| Saved {
                visible: listing.is_visible(&now),
                listing,
            })
            .collect(),
    })
}
