use crate::{
    error::{ArsenalDbError, ArsenalDbResult as Result},
    listings::{ListingId, ListingInfo},
    now,
    profiles::ProfileId,
    schema::wishlist,
};
use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pseudo struct used to manage table `wishlist`
pub struct Wishlist;

impl Wishlist {
    pub fn add(
        conn: &mut SqliteConnection,
        user: &ProfileId,
        listing: &ListingId,
    ) -> Result<WishlistItem> {
        use crate::schema::wishlist::dsl::*;
        if Self::contains(conn, user, listing)? {
            return Err(ArsenalDbError::AlreadyWishlisted);
        }
        let item = WishlistItem {
            id: Uuid::new_v4().to_string(),
            listing_id: listing.get_id().to_string(),
            user_id: user.get_id().to_string(),
            created_at: now(),
        };
        diesel::insert_into(wishlist).values(&item).execute(conn)?;
        Ok(item)
    }

    /// Returns whether anything was removed.
    pub fn remove(
        conn: &mut SqliteConnection,
        user: &ProfileId,
        listing: &ListingId,
    ) -> Result<bool> {
        use crate::schema::wishlist::dsl::*;
        let removed = diesel::delete(
            wishlist
                .filter(user_id.eq(user.get_id()))
                .filter(listing_id.eq(listing.get_id())),
        )
        .execute(conn)?;
        Ok(removed > 0)
    }

    pub fn contains(
        conn: &mut SqliteConnection,
        user: &ProfileId,
        listing: &ListingId,
    ) -> Result<bool> {
        Ok(WishlistFinder::new(conn, None)
            .user(user.get_id())
            .listing(listing.get_id())
            .count()?
            > 0)
    }

    /// The listings a user saved, most recently saved first.
    pub fn listings(conn: &mut SqliteConnection, user: &ProfileId) -> Result<Vec<ListingInfo>> {
        WishlistFinder::new(conn, None)
            .user(user.get_id())
            .search()?
            .into_iter()
            .map(|item| ListingId::find(conn, &item.listing_id)?.get_info(conn))
            .collect()
    }
}

/// A single saved listing, corresponding to a row in the table `wishlist`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = wishlist)]
pub struct WishlistItem {
    id: String,
    listing_id: String,
    user_id: String,
    created_at: NaiveDateTime,
}

impl WishlistItem {
    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_listing_id(&self) -> &str {
        &self.listing_id
    }

    pub fn get_user_id(&self) -> &str {
        &self.user_id
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }
}

type BoxedQuery<'a> = wishlist::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct WishlistFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> WishlistFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::wishlist::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: wishlist.into_boxed(),
            }
        }
    }

    pub fn delete_by_user(conn: &mut SqliteConnection, user: &ProfileId) -> Result<usize> {
        use crate::schema::wishlist::dsl::*;
        Ok(diesel::delete(wishlist.filter(user_id.eq(user.get_id()))).execute(conn)?)
    }

    pub fn delete_by_listing(conn: &mut SqliteConnection, listing: &ListingId) -> Result<usize> {
        use crate::schema::wishlist::dsl::*;
        Ok(diesel::delete(wishlist.filter(listing_id.eq(listing.get_id()))).execute(conn)?)
    }

    pub fn search(self) -> Result<Vec<WishlistItem>> {
        use crate::schema::wishlist::dsl::*;
        Ok(self
            .query
            .order(created_at.desc())
            .load::<WishlistItem>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn user(mut self, user: &'a str) -> Self {
        use crate::schema::wishlist::dsl::*;
        self.query = self.query.filter(user_id.eq(user));
        self
    }

    pub fn listing(mut self, listing: &'a str) -> Self {
        use crate::schema::wishlist::dsl::*;
        self.query = self.query.filter(listing_id.eq(listing));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        enums::{ListingCategory, ListingType},
        listings::IncompleteListing,
        profiles::ProfileForm,
        test_utils::establish_connection,
    };

    #[test]
    fn add_check_remove() {
        let mut conn = establish_connection();
        let seller = ProfileForm::new("seller@example.org", "Seller", "strongpasswd")
            .create(&mut conn)
            .unwrap();
        let buyer = ProfileForm::new("buyer@example.org", "Buyer", "strongpasswd")
            .create(&mut conn)
            .unwrap();
        let listing = IncompleteListing::new(
            ListingType::Sale,
            ListingCategory::Ammunition,
            "9mm, 1000 rounds",
            "Factory sealed",
            35_000,
        )
        .create(&mut conn, &seller)
        .unwrap();

        assert!(!Wishlist::contains(&mut conn, &buyer, &listing).unwrap());
        Wishlist::add(&mut conn, &buyer, &listing).unwrap();
        assert!(Wishlist::contains(&mut conn, &buyer, &listing).unwrap());
        assert!(matches!(
            Wishlist::add(&mut conn, &buyer, &listing),
            Err(ArsenalDbError::AlreadyWishlisted)
        ));

        let saved = Wishlist::listings(&mut conn, &buyer).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].get_title(), "9mm, 1000 rounds");

        assert!(Wishlist::remove(&mut conn, &buyer, &listing).unwrap());
        assert!(!Wishlist::remove(&mut conn, &buyer, &listing).unwrap());
        assert!(Wishlist::listings(&mut conn, &buyer).unwrap().is_empty());
    }

    #[test]
    fn deleted_listing_leaves_wishlists() {
        let mut conn = establish_connection();
        let seller = ProfileForm::new("seller@example.org", "Seller", "strongpasswd")
            .create(&mut conn)
            .unwrap();
        let buyer = ProfileForm::new("buyer@example.org", "Buyer", "strongpasswd")
            .create(&mut conn)
            .unwrap();
        let listing = IncompleteListing::new(
            ListingType::Trade,
            ListingCategory::Firearms,
            "Trade my shotgun",
            "For a rifle",
            0,
        )
        .create(&mut conn, &seller)
        .unwrap();
        Wishlist::add(&mut conn, &buyer, &listing).unwrap();

        listing.delete(&mut conn).unwrap();
        assert_eq!(
            WishlistFinder::new(&mut conn, None)
                .user(buyer.get_id())
                .count()
                .unwrap(),
            0
        );
    }
}
