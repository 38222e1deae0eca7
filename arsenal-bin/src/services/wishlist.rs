use crate::{infras::guards::*, DbConn, IntoFlash};
use arsenal_db::{error::ArsenalDbError, listings::ListingId, wishlist::Wishlist};
use rocket::response::{Flash, Redirect};

#[post("/add?<listing_id>")]
pub async fn add(
    user: ProfileIdGuard<Cookie>,
    listing_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let back = uri!(
        "/marketplace",
        crate::pages::marketplace::listing_page(listing_id.as_str())
    );
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?;
        Wishlist::add(c, &user.id, &listing)
    })
    .await
    .into_flash(back.clone())?;
    Ok(Flash::success(Redirect::to(back), "Saved to your wishlist"))
}

// Back to the wishlist, the listing itself may no longer be visible
#[post("/remove?<listing_id>")]
pub async fn remove(
    user: ProfileIdGuard<Cookie>,
    listing_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let back = uri!("/wishlist", crate::pages::wishlist::wishlist_page);
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?;
        Wishlist::remove(c, &user.id, &listing)
    })
    .await
    .into_flash(back.clone())?;
    Ok(Flash::success(
        Redirect::to(back),
        "Removed from your wishlist",
    ))
}
