use crate::{
    enums::{ListingCategory, ListingStatus, ListingType},
    error::{ArsenalDbError, ArsenalDbResult as Result},
    now,
    profiles::{ProfileId, ProfileInfo},
    schema::listings,
    wishlist::WishlistFinder,
    Cmp, Order,
};
use chrono::{Duration, NaiveDateTime};
use diesel::{prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of pictures attached to a single listing
pub const MAX_IMAGES: usize = 8;
/// Listings expire this many days after creation unless told otherwise
pub const DEFAULT_EXPIRY_DAYS: i64 = 60;

/// The ID referencing a single listing
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = listings)]
pub struct ListingId {
    id: String,
}

impl ListingId {
    pub fn find(conn: &mut SqliteConnection, id_provided: &str) -> Result<Self> {
        ListingFinder::new(conn, None)
            .id(id_provided)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::ListingNotFound
                }
                e => e,
            })
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_info(&self, conn: &mut SqliteConnection) -> Result<ListingInfo> {
        use crate::schema::listings::dsl::*;
        Ok(listings
            .filter(id.eq(&self.id))
            .first::<ListingInfo>(conn)?)
    }

    pub fn writable_by(&self, conn: &mut SqliteConnection, profile: &ProfileInfo) -> Result<bool> {
        Ok(profile.is_admin() || self.get_info(conn)?.get_seller_id() == profile.get_id())
    }

    /// Overwrite the text fields. Images, status and expiry are managed separately.
    pub fn update(&self, conn: &mut SqliteConnection, form: IncompleteListing) -> Result<ListingInfo> {
        let form = form.verify()?;
        let mut info = self.get_info(conn)?;
        info.listing_type = form.listing_type;
        info.category = form.category;
        info.title = form.title;
        info.description = form.description;
        info.price = form.price;
        info.update(conn)
    }

    pub fn add_image(&self, conn: &mut SqliteConnection, url: &str) -> Result<ListingInfo> {
        let info = self.get_info(conn)?;
        let mut images = info.get_images()?;
        if images.len() >= MAX_IMAGES {
            return Err(ArsenalDbError::TooManyImages(MAX_IMAGES));
        }
        images.push(url.to_string());
        info.set_images(&images)?.update(conn)
    }

    pub fn remove_image(&self, conn: &mut SqliteConnection, url: &str) -> Result<ListingInfo> {
        let info = self.get_info(conn)?;
        let images: Vec<String> = info.get_images()?.into_iter().filter(|x| x != url).collect();
        info.set_images(&images)?.update(conn)
    }

    // The owner's wishlists lose the listing too
    pub fn delete(self, conn: &mut SqliteConnection) -> Result<usize> {
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::listings::dsl::*;
            WishlistFinder::delete_by_listing(conn, &self)?;
            Ok(diesel::delete(listings.filter(id.eq(&self.id))).execute(conn)?)
        })
    }
}

/// The listing creation form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteListing {
    pub listing_type: ListingType,
    pub category: ListingCategory,
    pub title: String,
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<NaiveDateTime>,
}

impl IncompleteListing {
    pub fn new(
        listing_type: ListingType,
        category: ListingCategory,
        title: impl ToString,
        description: impl ToString,
        price: i64,
    ) -> Self {
        Self {
            listing_type,
            category,
            title: title.to_string(),
            description: description.to_string(),
            price,
            images: Vec::new(),
            expires_at: None,
        }
    }

    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn expires_at(mut self, time: NaiveDateTime) -> Self {
        self.expires_at = Some(time);
        self
    }

    pub fn verify(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();
        if title.is_empty() {
            return Err(ArsenalDbError::MissingField("title"));
        }
        if description.is_empty() {
            return Err(ArsenalDbError::MissingField("description"));
        }
        if self.price < 0 {
            return Err(ArsenalDbError::InvalidPrice);
        }
        if self.images.len() > MAX_IMAGES {
            return Err(ArsenalDbError::TooManyImages(MAX_IMAGES));
        }
        Ok(Self {
            title,
            description,
            ..self
        })
    }

    pub fn create(self, conn: &mut SqliteConnection, seller: &ProfileId) -> Result<ListingId> {
        use crate::schema::listings::dsl::*;
        let form = self.verify()?;
        let time = now();
        let info = ListingInfo {
            id: Uuid::new_v4().to_string(),
            seller_id: seller.get_id().to_string(),
            listing_type: form.listing_type,
            category: form.category,
            title: form.title,
            description: form.description,
            price: form.price,
            images: serde_json::to_string(&form.images)?,
            status: ListingStatus::Active,
            expires_at: Some(
                form.expires_at
                    .unwrap_or_else(|| time + Duration::days(DEFAULT_EXPIRY_DAYS)),
            ),
            featured: false,
            created_at: time,
        };
        diesel::insert_into(listings).values(&info).execute(conn)?;
        Ok(info.to_id())
    }
}

/// A single listing, corresponding to a row in the table `listings`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = listings)]
pub struct ListingInfo {
    id: String,
    seller_id: String,
    listing_type: ListingType,
    category: ListingCategory,
    title: String,
    description: String,
    price: i64,
    // JSON array of public URLs
    images: String,
    status: ListingStatus,
    expires_at: Option<NaiveDateTime>,
    featured: bool,
    created_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = listings, treat_none_as_null = true)]
struct ListingChanges<'a> {
    listing_type: ListingType,
    category: ListingCategory,
    title: &'a str,
    description: &'a str,
    price: i64,
    images: &'a str,
    status: ListingStatus,
    expires_at: Option<NaiveDateTime>,
    featured: bool,
}

impl ListingInfo {
    pub fn update(self, conn: &mut SqliteConnection) -> Result<Self> {
        use crate::schema::listings::dsl::*;
        diesel::update(listings.filter(id.eq(&self.id)))
            .set(ListingChanges {
                listing_type: self.listing_type,
                category: self.category,
                title: &self.title,
                description: &self.description,
                price: self.price,
                images: &self.images,
                status: self.status,
                expires_at: self.expires_at,
                featured: self.featured,
            })
            .execute(conn)?;
        self.to_id().get_info(conn)
    }

    pub fn to_id(&self) -> ListingId {
        ListingId {
            id: self.id.clone(),
        }
    }

    /// Shown to buyers only while active and not past its expiry.
    pub fn is_visible(&self, at: &NaiveDateTime) -> bool {
        self.status == ListingStatus::Active && self.expires_at.map_or(true, |e| e > *at)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_seller_id(&self) -> &str {
        &self.seller_id
    }

    pub fn get_listing_type(&self) -> ListingType {
        self.listing_type
    }

    pub fn get_category(&self) -> ListingCategory {
        self.category
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_price(&self) -> i64 {
        self.price
    }

    pub fn get_images(&self) -> Result<Vec<String>> {
        Ok(serde_json::from_str(&self.images)?)
    }

    pub fn get_status(&self) -> ListingStatus {
        self.status
    }

    pub fn get_expires_at(&self) -> Option<&NaiveDateTime> {
        self.expires_at.as_ref()
    }

    pub fn is_featured(&self) -> bool {
        self.featured
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }

    pub fn set_images(mut self, images: &[String]) -> Result<Self> {
        if images.len() > MAX_IMAGES {
            return Err(ArsenalDbError::TooManyImages(MAX_IMAGES));
        }
        self.images = serde_json::to_string(images)?;
        Ok(self)
    }

    pub fn set_status(mut self, status: ListingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn set_featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    pub fn set_expires_at(mut self, time: Option<NaiveDateTime>) -> Self {
        self.expires_at = time;
        self
    }
}

/// Sort keys of the marketplace browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    Price,
    Date,
}

type BoxedQuery<'a> = listings::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct ListingFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> ListingFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::listings::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: listings.into_boxed(),
            }
        }
    }

    pub fn list(conn: &'a mut SqliteConnection) -> Result<Vec<ListingId>> {
        Self::new(conn, None).search()
    }

    pub fn list_info(conn: &'a mut SqliteConnection) -> Result<Vec<ListingInfo>> {
        Self::new(conn, None).order_by(ListingOrder::Date, Order::Desc).search_info()
    }

    pub fn search(self) -> Result<Vec<ListingId>> {
        use crate::schema::listings::dsl::*;
        Ok(self
            .query
            .select(id)
            .load::<String>(self.conn)?
            .into_iter()
            .map(|x| ListingId { id: x })
            .collect())
    }

    // Order is left to `order_by`
    pub fn search_info(self) -> Result<Vec<ListingInfo>> {
        Ok(self.query.load::<ListingInfo>(self.conn)?)
    }

    pub fn first(self) -> Result<ListingId> {
        use crate::schema::listings::dsl::*;
        Ok(ListingId {
            id: self.query.select(id).first::<String>(self.conn)?,
        })
    }

    pub fn first_info(self) -> Result<ListingInfo> {
        Ok(self.query.first::<ListingInfo>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn id(mut self, id_provided: &'a str) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(id.eq(id_provided));
        self
    }

    pub fn seller(mut self, seller: &'a str) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(seller_id.eq(seller));
        self
    }

    /// Only listings buyers may see at the given time
    pub fn visible(mut self, at: NaiveDateTime) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self
            .query
            .filter(status.eq(ListingStatus::Active))
            .filter(expires_at.is_null().or(expires_at.gt(at)));
        self
    }

    pub fn category(mut self, category_provided: ListingCategory) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(category.eq(category_provided));
        self
    }

    pub fn listing_type(mut self, type_provided: ListingType) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(listing_type.eq(type_provided));
        self
    }

    pub fn status(mut self, status_provided: ListingStatus) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(status.eq(status_provided));
        self
    }

    pub fn featured(mut self, value: bool) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = self.query.filter(featured.eq(value));
        self
    }

    pub fn price(mut self, price_provided: i64, cmp: Cmp) -> Self {
        use crate::schema::listings::dsl::*;
        match cmp {
            Cmp::GreaterThan => self.query = self.query.filter(price.gt(price_provided)),
            Cmp::LessThan => self.query = self.query.filter(price.lt(price_provided)),
            Cmp::GreaterEqual => self.query = self.query.filter(price.ge(price_provided)),
            Cmp::LessEqual => self.query = self.query.filter(price.le(price_provided)),
            Cmp::NotEqual => self.query = self.query.filter(price.ne(price_provided)),
            Cmp::Equal => self.query = self.query.filter(price.eq(price_provided)),
        }
        self
    }

    // Featured listings always come first
    pub fn order_by(mut self, key: ListingOrder, order: Order) -> Self {
        use crate::schema::listings::dsl::*;
        self.query = match (key, order) {
            (ListingOrder::Price, Order::Asc) => self.query.order((featured.desc(), price.asc())),
            (ListingOrder::Price, Order::Desc) => {
                self.query.order((featured.desc(), price.desc()))
            }
            (ListingOrder::Date, Order::Asc) => {
                self.query.order((featured.desc(), created_at.asc()))
            }
            (ListingOrder::Date, Order::Desc) => {
                self.query.order((featured.desc(), created_at.desc()))
            }
        };
        self
    }
}

#[cfg(test)]
mod tests;
