use crate::{
    infras::{
        basics::{Choice, Dollars, Msg},
        guards::*,
    },
    table::Direction,
    DbConn, IntoFlash,
};
use arsenal_db::{
    enums::{ListingCategory, ListingStatus, ListingType},
    error::ArsenalDbError,
    listings::{ListingFinder, ListingId, ListingInfo, ListingOrder, MAX_IMAGES},
    profiles::{ProfileId, ProfileInfo},
    wishlist::Wishlist,
    Cmp, Order,
};
use askama::Template;
use chrono::Utc;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ListingSort {
    Price,
    Date,
}

impl ListingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Date => "date",
        }
    }
}

/// Browse filters, echoed back into the filter form
pub struct Filters {
    pub categories: Vec<Choice>,
    pub types: Vec<Choice>,
    pub sorts: Vec<Choice>,
    pub dirs: Vec<Choice>,
    pub min: String,
    pub max: String,
}

#[derive(Template)]
#[template(path = "marketplace/browse.html")]
pub struct BrowsePage {
    inner: Msg,
    listings: Vec<ListingInfo>,
    filters: Filters,
}

// Only visible listings, featured ones first. Newest first by default.
#[allow(clippy::too_many_arguments)]
#[get("/?<category>&<listing_type>&<sort>&<dir>&<min>&<max>")]
pub async fn browse(
    category: Option<ListingCategory>,
    listing_type: Option<ListingType>,
    sort: Option<ListingSort>,
    dir: Option<Direction>,
    min: Option<String>,
    max: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<BrowsePage, Flash<Redirect>> {
    let sort = sort.unwrap_or(ListingSort::Date);
    let dir = dir.unwrap_or(match sort {
        ListingSort::Date => Direction::Desc,
        ListingSort::Price => Direction::Asc,
    });
    let min = min.unwrap_or_default();
    let max = max.unwrap_or_default();
    let min_cents = crate::parse_cents(&min);
    let max_cents = crate::parse_cents(&max);

    let listings = conn
        .run(move |c| {
            let mut finder = ListingFinder::new(c, None).visible(Utc::now().naive_utc());
            if let Some(category) = category {
                finder = finder.category(category);
            }
            if let Some(listing_type) = listing_type {
                finder = finder.listing_type(listing_type);
            }
            if let Some(min) = min_cents {
                finder = finder.price(min, Cmp::GreaterEqual);
            }
            if let Some(max) = max_cents {
                finder = finder.price(max, Cmp::LessEqual);
            }
            let key = match sort {
                ListingSort::Price => ListingOrder::Price,
                ListingSort::Date => ListingOrder::Date,
            };
            let order = match dir {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            finder.order_by(key, order).search_info()
        })
        .await
        .into_flash(uri!("/"))?;

    Ok(BrowsePage {
        inner: Msg::from_flash(flash),
        listings,
        filters: Filters {
            categories: Choice::list(ListingCategory::ALL, category, ListingCategory::as_str),
            types: Choice::list(ListingType::ALL, listing_type, ListingType::as_str),
            sorts: Choice::list(
                &[ListingSort::Date, ListingSort::Price],
                Some(sort),
                ListingSort::as_str,
            ),
            dirs: Choice::list(&[Direction::Asc, Direction::Desc], Some(dir), Direction::as_str),
            min,
            max,
        },
    })
}

#[derive(Template)]
#[template(path = "marketplace/listing.html")]
pub struct ListingPage {
    inner: Msg,
    listing: ListingInfo,
    images: Vec<String>,
    seller: ProfileInfo,
    writable: bool,
    signed_in: bool,
    wishlisted: bool,
}

// Hidden listings can still be seen by their seller and admins
#[get("/<listing_id>", rank = 3)]
pub async fn listing_page(
    listing_id: String,
    viewer: Option<ProfileInfoGuard<Cookie>>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<ListingPage, Flash<Redirect>> {
    let signed_in = viewer.is_some();
    let (listing, seller, writable, wishlisted) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let id = ListingId::find(c, &listing_id)?;
            let listing = id.get_info(c)?;
            let (writable, wishlisted) = match &viewer {
                Some(v) => (
                    id.writable_by(c, &v.info)?,
                    Wishlist::contains(c, &v.info.to_id(), &id)?,
                ),
                None => (false, false),
            };
            if !listing.is_visible(&Utc::now().naive_utc()) && !writable {
                return Err(ArsenalDbError::ListingNotFound);
            }
            let seller = ProfileId::find(c, listing.get_seller_id())?.get_info(c)?;
            Ok((listing, seller, writable, wishlisted))
        })
        .await
        .into_flash(uri!("/marketplace", browse(_, _, _, _, _, _)))?;

    let images = listing
        .get_images()
        .into_flash(uri!("/marketplace", browse(_, _, _, _, _, _)))?;
    Ok(ListingPage {
        inner: Msg::from_flash(flash),
        listing,
        images,
        seller,
        writable,
        signed_in,
        wishlisted,
    })
}

#[derive(Template)]
#[template(path = "marketplace/form.html")]
pub struct ListingFormPage {
    inner: Msg,
    listing: Option<ListingInfo>,
    images: Vec<String>,
    max_images: usize,
    categories: Vec<Choice>,
    types: Vec<Choice>,
    statuses: Vec<Choice>,
    admin: bool,
}

impl ListingFormPage {
    fn new(inner: Msg, listing: Option<ListingInfo>, images: Vec<String>, admin: bool) -> Self {
        let current = listing.as_ref();
        // Sellers never see the suspended status, unless they are admins
        let statuses: Vec<ListingStatus> = ListingStatus::ALL
            .iter()
            .copied()
            .filter(|s| admin || *s != ListingStatus::Suspended)
            .collect();
        Self {
            categories: Choice::list(
                ListingCategory::ALL,
                current.map(ListingInfo::get_category),
                ListingCategory::as_str,
            ),
            types: Choice::list(
                ListingType::ALL,
                current.map(ListingInfo::get_listing_type),
                ListingType::as_str,
            ),
            statuses: Choice::list(
                &statuses,
                current.map(ListingInfo::get_status),
                ListingStatus::as_str,
            ),
            inner,
            listing,
            images,
            max_images: MAX_IMAGES,
            admin,
        }
    }

    // Only admins lift a suspension
    fn status_locked(&self) -> bool {
        !self.admin
            && self
                .listing
                .as_ref()
                .map_or(false, |l| l.get_status() == ListingStatus::Suspended)
    }
}

#[get("/new")]
pub async fn new_listing_page(
    _role: Role<Seller>,
    user: ProfileInfoGuard<Cookie>,
    flash: Option<FlashMessage<'_>>,
) -> ListingFormPage {
    ListingFormPage::new(
        Msg::from_flash(flash),
        None,
        Vec::new(),
        user.info.is_admin(),
    )
}

#[get("/edit?<listing_id>")]
pub async fn edit_listing_page(
    _auth: Auth<ListingWritable>,
    user: ProfileInfoGuard<Cookie>,
    listing_id: String,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<ListingFormPage, Flash<Redirect>> {
    let listing = conn
        .run(move |c| ListingId::find(c, &listing_id)?.get_info(c))
        .await
        .into_flash(uri!("/marketplace", browse(_, _, _, _, _, _)))?;
    let images = listing
        .get_images()
        .into_flash(uri!("/marketplace", browse(_, _, _, _, _, _)))?;
    Ok(ListingFormPage::new(
        Msg::from_flash(flash),
        Some(listing),
        images,
        user.info.is_admin(),
    ))
}
