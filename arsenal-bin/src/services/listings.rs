use crate::{
    infras::{
        guards::*,
        storage::{Bucket, ObjectStorage, Storage},
    },
    pages::marketplace::*,
    parse_cents,
    services::establishments::ImageForm,
    DbConn, IntoFlash,
};
use arsenal_db::{
    enums::{ListingCategory, ListingStatus, ListingType},
    error::ArsenalDbError,
    listings::{IncompleteListing, ListingId, MAX_IMAGES},
};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    State,
};

/// The listing form; the price is typed in dollars
#[derive(Debug, FromForm, Clone)]
pub struct ListingForm {
    pub listing_type: ListingType,
    pub category: ListingCategory,
    pub title: String,
    pub description: String,
    pub price: String,
}

impl ListingForm {
    pub fn to_incomplete(&self) -> Result<IncompleteListing, ArsenalDbError> {
        let price = parse_cents(&self.price).ok_or(ArsenalDbError::InvalidPrice)?;
        Ok(IncompleteListing::new(
            self.listing_type,
            self.category,
            &self.title,
            &self.description,
            price,
        ))
    }
}

fn edit_page(listing_id: &str) -> rocket::http::uri::Origin<'static> {
    uri!("/marketplace", edit_listing_page(listing_id))
}

#[post("/new", data = "<info>")]
pub async fn create_listing(
    _role: Role<Seller>,
    user: ProfileIdGuard<Cookie>,
    info: Form<ListingForm>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let listing = info.to_incomplete().into_flash(uri!("/marketplace", new_listing_page))?;
    let id = conn
        .run(move |c| listing.create(c, &user.id))
        .await
        .into_flash(uri!("/marketplace", new_listing_page))?;
    // Straight to the form so images can be added
    Ok(Redirect::to(edit_page(id.get_id())))
}

#[post("/edit?<listing_id>", data = "<info>")]
pub async fn update_listing(
    _auth: Auth<ListingWritable>,
    listing_id: String,
    info: Form<ListingForm>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = edit_page(&listing_id);
    let listing = info.to_incomplete().into_flash(back.clone())?;
    let updated = conn
        .run(move |c| ListingId::find(c, &listing_id)?.update(c, listing))
        .await
        .into_flash(back)?;
    Ok(Redirect::to(uri!("/marketplace", listing_page(updated.get_id()))))
}

// The image limit is checked before uploading so no orphan objects are left behind
#[post("/images?<listing_id>", data = "<form>")]
pub async fn upload_image(
    _auth: Auth<ListingWritable>,
    user: ProfileIdGuard<Cookie>,
    listing_id: String,
    form: Form<ImageForm>,
    storage: &State<Storage>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = edit_page(&listing_id);
    let image = form.into_inner().image.validate().into_flash(back.clone())?;
    let id = listing_id.clone();
    let count = conn
        .run(move |c| -> Result<usize, ArsenalDbError> {
            Ok(ListingId::find(c, &id)?.get_info(c)?.get_images()?.len())
        })
        .await
        .into_flash(back.clone())?;
    if count >= MAX_IMAGES {
        return Err(Flash::error(
            Redirect::to(back),
            ArsenalDbError::TooManyImages(MAX_IMAGES).to_string(),
        ));
    }

    let url = storage
        .put(
            Bucket::Listings,
            Some(listing_id.as_str()),
            user.id.get_id(),
            image.object,
        )
        .await
        .into_flash(back.clone())?;
    conn.run(move |c| ListingId::find(c, &listing_id)?.add_image(c, &url))
        .await
        .into_flash(back.clone())?;
    Ok(Redirect::to(back))
}

#[get("/images/remove?<listing_id>&<url>")]
pub async fn remove_image(
    _auth: Auth<ListingWritable>,
    listing_id: String,
    url: String,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = edit_page(&listing_id);
    conn.run(move |c| ListingId::find(c, &listing_id)?.remove_image(c, &url))
        .await
        .into_flash(back.clone())?;
    Ok(Redirect::to(back))
}

#[derive(Debug, FromForm, Clone)]
pub struct StatusForm {
    pub status: ListingStatus,
}

// Only admins may suspend a listing or lift a suspension
#[post("/status?<listing_id>", data = "<info>")]
pub async fn set_status(
    _auth: Auth<ListingWritable>,
    user: ProfileInfoGuard<Cookie>,
    listing_id: String,
    info: Form<StatusForm>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = edit_page(&listing_id);
    let status = info.status;
    let admin = user.info.is_admin();
    conn.run(move |c| -> Result<_, ArsenalDbError> {
        let listing = ListingId::find(c, &listing_id)?.get_info(c)?;
        if !admin
            && (status == ListingStatus::Suspended
                || listing.get_status() == ListingStatus::Suspended)
        {
            return Err(ArsenalDbError::NotPermitted);
        }
        listing.set_status(status).update(c)
    })
    .await
    .into_flash(back.clone())?;
    Ok(Redirect::to(back))
}

#[get("/delete?<listing_id>")]
pub async fn delete_listing(
    _auth: Auth<ListingWritable>,
    listing_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| ListingId::find(c, &listing_id)?.delete(c))
        .await
        .into_flash(uri!("/user", crate::pages::users::portal))?;
    Ok(Flash::success(
        Redirect::to(uri!("/user", crate::pages::users::portal)),
        "The listing has been deleted",
    ))
}
