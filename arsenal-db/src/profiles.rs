use crate::{
    credits::CreditTransactions,
    error::{ArsenalDbError, ArsenalDbResult as Result},
    establishments::EstablishmentFinder,
    events::EventFinder,
    listings::ListingFinder,
    now,
    posts::PostFinder,
    schema::profiles,
    wishlist::WishlistFinder,
};
use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::Sqlite};
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MIN_PASSWD_LEN: usize = 8;

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(ArsenalDbError::InvalidEmail),
    }
}

/// The ID referencing a single profile
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = profiles)]
pub struct ProfileId {
    id: String,
}

impl ProfileId {
    /// Find a profile with the given ID. Disabled profiles are also returned.
    pub fn find(conn: &mut SqliteConnection, id_provided: &str) -> Result<Self> {
        ProfileFinder::new(conn, None)
            .id(id_provided)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::UserNotFound
                }
                e => e,
            })
    }

    pub fn find_by_email(conn: &mut SqliteConnection, email_provided: &str) -> Result<Self> {
        let email = normalize_email(email_provided)?;
        ProfileFinder::new(conn, None)
            .email(&email)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::UserNotFound
                }
                e => e,
            })
    }

    // Return the ID of the user logged in
    pub fn login(conn: &mut SqliteConnection, email: &str, passwd: &str) -> Result<Self> {
        let info = Self::find_by_email(conn, email)?.get_info(conn)?;
        if info.is_disabled {
            Err(ArsenalDbError::DisabledUser)
        } else if info.verify_passwd(passwd)? {
            Ok(info.to_id())
        } else {
            Err(ArsenalDbError::IncorrectPassword)
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_info(&self, conn: &mut SqliteConnection) -> Result<ProfileInfo> {
        use crate::schema::profiles::dsl::*;
        Ok(profiles.filter(id.eq(&self.id)).first::<ProfileInfo>(conn)?)
    }

    // Everything the user owns goes with the user.
    pub fn delete(self, conn: &mut SqliteConnection) -> Result<usize> {
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::profiles::dsl::*;
            WishlistFinder::delete_by_user(conn, &self)?;
            for listing in ListingFinder::new(conn, None).seller(&self.id).search()? {
                listing.delete(conn)?;
            }
            EventFinder::delete_by_creator(conn, &self)?;
            PostFinder::delete_by_author(conn, &self)?;
            for establishment in EstablishmentFinder::new(conn, None).owner(&self.id).search()? {
                establishment.delete(conn)?;
            }
            CreditTransactions::delete_by_profile(conn, &self)?;
            Ok(diesel::delete(profiles.filter(id.eq(&self.id))).execute(conn)?)
        })
    }
}

/// The registration form
#[derive(Debug, Clone, FromForm)]
pub struct ProfileForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl ProfileForm {
    pub fn new(email: impl ToString, username: impl ToString, password: impl ToString) -> Self {
        Self {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn create(self, conn: &mut SqliteConnection) -> Result<ProfileId> {
        use crate::schema::profiles::dsl::*;
        let email_normalized = normalize_email(&self.email)?;
        if self.username.trim().is_empty() {
            return Err(ArsenalDbError::MissingField("username"));
        }
        if self.password.chars().count() < MIN_PASSWD_LEN {
            return Err(ArsenalDbError::WeakPassword);
        }

        if ProfileFinder::new(conn, None)
            .email(&email_normalized)
            .count()?
            > 0
        {
            return Err(ArsenalDbError::UserRegistered);
        }

        let info = ProfileInfo {
            id: Uuid::new_v4().to_string(),
            email: email_normalized,
            username: self.username.trim().to_string(),
            hashed_passwd: bcrypt::hash(&self.password, bcrypt::DEFAULT_COST)?,
            is_admin: false,
            is_seller: false,
            is_verified: false,
            is_disabled: false,
            notes: None,
            credits: 0,
            created_at: now(),
        };
        diesel::insert_into(profiles).values(&info).execute(conn)?;
        Ok(info.to_id())
    }
}

/// A single profile, corresponding to a row in the table `profiles`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = profiles)]
pub struct ProfileInfo {
    id: String,
    email: String,
    username: String,
    #[serde(skip_serializing)]
    hashed_passwd: String,
    is_admin: bool,
    is_seller: bool,
    is_verified: bool,
    is_disabled: bool,
    notes: Option<String>,
    // Only ever changed through the credit ledger
    credits: i64,
    created_at: NaiveDateTime,
}

// Everything but the ID, the email and the credit balance can be updated in place.
#[derive(AsChangeset)]
#[diesel(table_name = profiles, treat_none_as_null = true)]
struct ProfileChanges<'a> {
    username: &'a str,
    hashed_passwd: &'a str,
    is_admin: bool,
    is_seller: bool,
    is_verified: bool,
    is_disabled: bool,
    notes: Option<&'a str>,
}

impl ProfileInfo {
    pub fn update(self, conn: &mut SqliteConnection) -> Result<Self> {
        use crate::schema::profiles::dsl::*;
        let changes = ProfileChanges {
            username: &self.username,
            hashed_passwd: &self.hashed_passwd,
            is_admin: self.is_admin,
            is_seller: self.is_seller,
            is_verified: self.is_verified,
            is_disabled: self.is_disabled,
            notes: self.notes.as_deref(),
        };
        diesel::update(profiles.filter(id.eq(&self.id)))
            .set(changes)
            .execute(conn)?;
        self.to_id().get_info(conn)
    }

    pub fn to_id(&self) -> ProfileId {
        ProfileId {
            id: self.id.clone(),
        }
    }

    pub fn verify_passwd(&self, passwd: impl AsRef<[u8]>) -> Result<bool> {
        Ok(bcrypt::verify(passwd, &self.hashed_passwd)?)
    }

    pub fn set_password(mut self, passwd: impl AsRef<[u8]>) -> Result<Self> {
        if passwd.as_ref().len() < MIN_PASSWD_LEN {
            return Err(ArsenalDbError::WeakPassword);
        }
        self.hashed_passwd = bcrypt::hash(passwd, bcrypt::DEFAULT_COST)?;
        Ok(self)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_email(&self) -> &str {
        &self.email
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn get_credits(&self) -> i64 {
        self.credits
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_seller(&self) -> bool {
        self.is_seller
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    // Sellers may post listings, admins may do anything
    pub fn can_sell(&self) -> bool {
        self.is_seller || self.is_admin
    }

    pub fn set_username(mut self, username: impl ToString) -> Self {
        self.username = username.to_string();
        self
    }

    pub fn set_admin(mut self, admin: bool) -> Self {
        self.is_admin = admin;
        self
    }

    pub fn set_seller(mut self, seller: bool) -> Self {
        self.is_seller = seller;
        self
    }

    pub fn set_verified(mut self, verified: bool) -> Self {
        self.is_verified = verified;
        self
    }

    pub fn set_disabled(mut self, disabled: bool) -> Self {
        self.is_disabled = disabled;
        self
    }

    pub fn set_notes(mut self, notes: Option<impl ToString>) -> Self {
        self.notes = notes
            .map(|n| n.to_string())
            .filter(|n| !n.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub total: i64,
    pub admins: i64,
    pub sellers: i64,
    pub verified: i64,
    pub disabled: i64,
}

type BoxedQuery<'a> = profiles::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct ProfileFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> ProfileFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::profiles::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: profiles.into_boxed(),
            }
        }
    }

    pub fn list(conn: &'a mut SqliteConnection) -> Result<Vec<ProfileId>> {
        Self::new(conn, None).search()
    }

    pub fn list_info(conn: &'a mut SqliteConnection) -> Result<Vec<ProfileInfo>> {
        Self::new(conn, None).search_info()
    }

    pub fn stats(conn: &mut SqliteConnection) -> Result<ProfileStats> {
        use crate::schema::profiles::dsl::*;
        Ok(ProfileStats {
            total: profiles.count().get_result(conn)?,
            admins: profiles.filter(is_admin.eq(true)).count().get_result(conn)?,
            sellers: profiles.filter(is_seller.eq(true)).count().get_result(conn)?,
            verified: profiles
                .filter(is_verified.eq(true))
                .count()
                .get_result(conn)?,
            disabled: profiles
                .filter(is_disabled.eq(true))
                .count()
                .get_result(conn)?,
        })
    }

    pub fn search(self) -> Result<Vec<ProfileId>> {
        use crate::schema::profiles::dsl::*;
        Ok(self
            .query
            .select(id)
            .load::<String>(self.conn)?
            .into_iter()
            .map(|x| ProfileId { id: x })
            .collect())
    }

    pub fn search_info(self) -> Result<Vec<ProfileInfo>> {
        use crate::schema::profiles::dsl::*;
        Ok(self
            .query
            .order(created_at.asc())
            .load::<ProfileInfo>(self.conn)?)
    }

    pub fn first(self) -> Result<ProfileId> {
        use crate::schema::profiles::dsl::*;
        Ok(ProfileId {
            id: self.query.select(id).first::<String>(self.conn)?,
        })
    }

    pub fn first_info(self) -> Result<ProfileInfo> {
        Ok(self.query.first::<ProfileInfo>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn id(mut self, id_provided: &'a str) -> Self {
        use crate::schema::profiles::dsl::*;
        self.query = self.query.filter(id.eq(id_provided));
        self
    }

    // The email must already be normalized
    pub fn email(mut self, email_provided: &'a str) -> Self {
        use crate::schema::profiles::dsl::*;
        self.query = self.query.filter(email.eq(email_provided));
        self
    }

    // Disabled users are treated as if they don't exist
    pub fn allowed(mut self) -> Self {
        use crate::schema::profiles::dsl::*;
        self.query = self.query.filter(is_disabled.eq(false));
        self
    }

    pub fn admin(mut self, admin: bool) -> Self {
        use crate::schema::profiles::dsl::*;
        self.query = self.query.filter(is_admin.eq(admin));
        self
    }

    pub fn seller(mut self, seller: bool) -> Self {
        use crate::schema::profiles::dsl::*;
        self.query = self.query.filter(is_seller.eq(seller));
        self
    }
}

#[cfg(test)]
mod tests;
