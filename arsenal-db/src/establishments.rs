use crate::{
    enums::EstablishmentKind,
    error::{ArsenalDbError, ArsenalDbResult as Result},
    now,
    posts::PostFinder,
    profiles::ProfileId,
    schema::establishments,
    slugs::unique_slug,
};
use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::Sqlite};
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn slug_taken(conn: &mut SqliteConnection, candidate: &str, except: Option<&str>) -> Result<bool> {
    use crate::schema::establishments::dsl::*;
    let mut query = establishments.filter(slug.eq(candidate)).into_boxed();
    if let Some(except) = except {
        query = query.filter(id.ne(except));
    }
    Ok(query.count().get_result::<i64>(conn)? > 0)
}

// Blank optional fields are stored as NULL
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The ID referencing a single establishment
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = establishments)]
pub struct EstablishmentId {
    id: String,
}

impl EstablishmentId {
    pub fn find(conn: &mut SqliteConnection, id_provided: &str) -> Result<Self> {
        EstablishmentFinder::new(conn, None)
            .id(id_provided)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::EstablishmentNotFound
                }
                e => e,
            })
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_info(&self, conn: &mut SqliteConnection) -> Result<EstablishmentInfo> {
        use crate::schema::establishments::dsl::*;
        Ok(establishments
            .filter(id.eq(&self.id))
            .first::<EstablishmentInfo>(conn)?)
    }

    /// Whether the given profile may mutate this establishment.
    pub fn owned_by(&self, conn: &mut SqliteConnection, profile: &ProfileId) -> Result<bool> {
        Ok(self.get_info(conn)?.get_owner_id() == profile.get_id())
    }

    // Overwrite the editable fields with the form. The slug follows the business name.
    pub fn update(
        &self,
        conn: &mut SqliteConnection,
        form: IncompleteEstablishment,
    ) -> Result<EstablishmentInfo> {
        let form = form.verify()?;
        let mut info = self.get_info(conn)?;
        if info.business_name != form.business_name {
            info.slug = unique_slug(&form.business_name, |s| {
                slug_taken(conn, s, Some(self.id.as_str()))
            })?;
        }
        // The kind of an establishment is fixed at creation.
        info.business_name = form.business_name;
        info.location = form.location;
        info.description = form.description;
        info.phone = form.phone;
        info.email = form.email;
        info.website = form.website;
        info.update(conn)
    }

    // Posts pointing at the establishment lose their association rather than vanishing.
    pub fn delete(self, conn: &mut SqliteConnection) -> Result<usize> {
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::establishments::dsl::*;
            PostFinder::detach_establishment(conn, &self)?;
            Ok(diesel::delete(establishments.filter(id.eq(&self.id))).execute(conn)?)
        })
    }
}

/// The form used to create or edit an establishment
#[derive(Debug, Clone, FromForm, Serialize, Deserialize)]
pub struct IncompleteEstablishment {
    pub kind: EstablishmentKind,
    pub business_name: String,
    pub location: String,
    #[field(default = String::new())]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl IncompleteEstablishment {
    pub fn new(kind: EstablishmentKind, business_name: impl ToString, location: impl ToString) -> Self {
        Self {
            kind,
            business_name: business_name.to_string(),
            location: location.to_string(),
            description: String::new(),
            phone: None,
            email: None,
            website: None,
        }
    }

    pub fn description(mut self, description: impl ToString) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn phone(mut self, phone: impl ToString) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn website(mut self, website: impl ToString) -> Self {
        self.website = Some(website.to_string());
        self
    }

    pub fn verify(self) -> Result<Self> {
        let business_name = self.business_name.trim().to_string();
        let location = self.location.trim().to_string();
        if business_name.is_empty() {
            return Err(ArsenalDbError::MissingField("business name"));
        }
        if location.is_empty() {
            return Err(ArsenalDbError::MissingField("location"));
        }
        Ok(Self {
            kind: self.kind,
            business_name,
            location,
            description: self.description.trim().to_string(),
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            website: non_blank(self.website),
        })
    }

    pub fn create(self, conn: &mut SqliteConnection, owner: &ProfileId) -> Result<EstablishmentId> {
        use crate::schema::establishments::dsl::*;
        let form = self.verify()?;
        let info = EstablishmentInfo {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.get_id().to_string(),
            kind: form.kind,
            slug: unique_slug(&form.business_name, |s| slug_taken(conn, s, None))?,
            business_name: form.business_name,
            logo_url: None,
            location: form.location,
            description: form.description,
            phone: form.phone,
            email: form.email,
            website: form.website,
            created_at: now(),
        };
        diesel::insert_into(establishments)
            .values(&info)
            .execute(conn)?;
        Ok(info.to_id())
    }
}

/// A single establishment, corresponding to a row in the table `establishments`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = establishments)]
pub struct EstablishmentInfo {
    id: String,
    owner_id: String,
    kind: EstablishmentKind,
    business_name: String,
    slug: String,
    logo_url: Option<String>,
    location: String,
    description: String,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = establishments, treat_none_as_null = true)]
struct EstablishmentChanges<'a> {
    owner_id: &'a str,
    business_name: &'a str,
    slug: &'a str,
    logo_url: Option<&'a str>,
    location: &'a str,
    description: &'a str,
    phone: Option<&'a str>,
    email: Option<&'a str>,
    website: Option<&'a str>,
}

impl EstablishmentInfo {
    pub fn update(self, conn: &mut SqliteConnection) -> Result<Self> {
        use crate::schema::establishments::dsl::*;
        diesel::update(establishments.filter(id.eq(&self.id)))
            .set(EstablishmentChanges {
                owner_id: &self.owner_id,
                business_name: &self.business_name,
                slug: &self.slug,
                logo_url: self.logo_url.as_deref(),
                location: &self.location,
                description: &self.description,
                phone: self.phone.as_deref(),
                email: self.email.as_deref(),
                website: self.website.as_deref(),
            })
            .execute(conn)?;
        self.to_id().get_info(conn)
    }

    pub fn to_id(&self) -> EstablishmentId {
        EstablishmentId {
            id: self.id.clone(),
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn get_kind(&self) -> EstablishmentKind {
        self.kind
    }

    pub fn get_business_name(&self) -> &str {
        &self.business_name
    }

    pub fn get_slug(&self) -> &str {
        &self.slug
    }

    pub fn get_logo_url(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn get_email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn get_website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }

    pub fn set_logo_url(mut self, url: impl ToString) -> Self {
        self.logo_url = Some(url.to_string());
        self
    }

    pub fn set_owner(mut self, owner: &ProfileId) -> Self {
        self.owner_id = owner.get_id().to_string();
        self
    }
}

type BoxedQuery<'a> = establishments::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct EstablishmentFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> EstablishmentFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::establishments::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: establishments.into_boxed(),
            }
        }
    }

    pub fn list(conn: &'a mut SqliteConnection) -> Result<Vec<EstablishmentId>> {
        Self::new(conn, None).search()
    }

    pub fn list_info(conn: &'a mut SqliteConnection) -> Result<Vec<EstablishmentInfo>> {
        Self::new(conn, None).search_info()
    }

    pub fn search(self) -> Result<Vec<EstablishmentId>> {
        use crate::schema::establishments::dsl::*;
        Ok(self
            .query
            .select(id)
            .load::<String>(self.conn)?
            .into_iter()
            .map(|x| EstablishmentId { id: x })
            .collect())
    }

    pub fn search_info(self) -> Result<Vec<EstablishmentInfo>> {
        use crate::schema::establishments::dsl::*;
        Ok(self
            .query
            .order(business_name.asc())
            .load::<EstablishmentInfo>(self.conn)?)
    }

    pub fn first(self) -> Result<EstablishmentId> {
        use crate::schema::establishments::dsl::*;
        Ok(EstablishmentId {
            id: self.query.select(id).first::<String>(self.conn)?,
        })
    }

    pub fn first_info(self) -> Result<EstablishmentInfo> {
        Ok(self.query.first::<EstablishmentInfo>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn id(mut self, id_provided: &'a str) -> Self {
        use crate::schema::establishments::dsl::*;
        self.query = self.query.filter(id.eq(id_provided));
        self
    }

    pub fn kind(mut self, kind_provided: EstablishmentKind) -> Self {
        use crate::schema::establishments::dsl::*;
        self.query = self.query.filter(kind.eq(kind_provided));
        self
    }

    pub fn owner(mut self, owner: &'a str) -> Self {
        use crate::schema::establishments::dsl::*;
        self.query = self.query.filter(owner_id.eq(owner));
        self
    }

    pub fn slug(mut self, slug_provided: &'a str) -> Self {
        use crate::schema::establishments::dsl::*;
        self.query = self.query.filter(slug.eq(slug_provided));
        self
    }
}

#[cfg(test)]
mod tests;
