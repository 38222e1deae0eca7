use crate::{
    enums::{EstablishmentKind, PostCategory},
    error::{ArsenalDbError, ArsenalDbResult as Result},
    establishments::{EstablishmentFinder, EstablishmentId},
    now,
    profiles::{ProfileId, ProfileInfo},
    schema::posts,
    slugs::unique_slug,
};
use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::Sqlite};
use rocket::FromForm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn slug_taken(conn: &mut SqliteConnection, candidate: &str, except: Option<&str>) -> Result<bool> {
    use crate::schema::posts::dsl::*;
    let mut query = posts.filter(slug.eq(candidate)).into_boxed();
    if let Some(except) = except {
        query = query.filter(id.ne(except));
    }
    Ok(query.count().get_result::<i64>(conn)? > 0)
}

/// The establishment a post belongs to.
///
/// The table stores this as four nullable foreign keys of which at most one may be set. This type
/// is the only way the crate reads or writes those columns, so the exclusivity always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Association {
    Store(String),
    Club(String),
    Range(String),
    Servicing(String),
}

/// The raw column values of an association
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationColumns {
    pub store_id: Option<String>,
    pub club_id: Option<String>,
    pub range_id: Option<String>,
    pub servicing_id: Option<String>,
}

impl AssociationColumns {
    pub fn into_association(self) -> Result<Option<Association>> {
        match (self.store_id, self.club_id, self.range_id, self.servicing_id) {
            (None, None, None, None) => Ok(None),
            (Some(id), None, None, None) => Ok(Some(Association::Store(id))),
            (None, Some(id), None, None) => Ok(Some(Association::Club(id))),
            (None, None, Some(id), None) => Ok(Some(Association::Range(id))),
            (None, None, None, Some(id)) => Ok(Some(Association::Servicing(id))),
            _ => Err(ArsenalDbError::AmbiguousAssociation),
        }
    }
}

impl From<Option<&Association>> for AssociationColumns {
    fn from(association: Option<&Association>) -> Self {
        let mut columns = Self::default();
        match association {
            Some(Association::Store(id)) => columns.store_id = Some(id.clone()),
            Some(Association::Club(id)) => columns.club_id = Some(id.clone()),
            Some(Association::Range(id)) => columns.range_id = Some(id.clone()),
            Some(Association::Servicing(id)) => columns.servicing_id = Some(id.clone()),
            None => {}
        }
        columns
    }
}

impl Association {
    pub fn new(kind: EstablishmentKind, id: impl ToString) -> Self {
        let id = id.to_string();
        match kind {
            EstablishmentKind::Store => Self::Store(id),
            EstablishmentKind::Club => Self::Club(id),
            EstablishmentKind::Range => Self::Range(id),
            EstablishmentKind::Servicing => Self::Servicing(id),
        }
    }

    pub fn kind(&self) -> EstablishmentKind {
        match self {
            Self::Store(_) => EstablishmentKind::Store,
            Self::Club(_) => EstablishmentKind::Club,
            Self::Range(_) => EstablishmentKind::Range,
            Self::Servicing(_) => EstablishmentKind::Servicing,
        }
    }

    pub fn establishment_id(&self) -> &str {
        match self {
            Self::Store(id) | Self::Club(id) | Self::Range(id) | Self::Servicing(id) => id,
        }
    }

    /// Work out which establishment a new post belongs to.
    ///
    /// An explicitly requested establishment must exist, be of the requested kind and be owned
    /// by the author (admins may post on behalf of anyone). Without a request, the post is
    /// attached to the author's establishment if they own exactly one.
    pub fn resolve(
        conn: &mut SqliteConnection,
        author: &ProfileInfo,
        requested: Option<(EstablishmentKind, &str)>,
    ) -> Result<Option<Self>> {
        match requested {
            Some((kind, id)) => {
                let info = EstablishmentId::find(conn, id)?.get_info(conn)?;
                if info.get_kind() != kind {
                    Err(ArsenalDbError::EstablishmentKindMismatch)
                } else if info.get_owner_id() != author.get_id() && !author.is_admin() {
                    Err(ArsenalDbError::NotPermitted)
                } else {
                    Ok(Some(Self::new(kind, info.get_id())))
                }
            }
            None => {
                let mut owned = EstablishmentFinder::new(conn, None)
                    .owner(author.get_id())
                    .search_info()?;
                if owned.len() == 1 {
                    let only = owned.remove(0);
                    Ok(Some(Self::new(only.get_kind(), only.get_id())))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// The ID referencing a single post
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = posts)]
pub struct PostId {
    id: String,
}

impl PostId {
    pub fn find(conn: &mut SqliteConnection, id_provided: &str) -> Result<Self> {
        PostFinder::new(conn, None)
            .id(id_provided)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::PostNotFound
                }
                e => e,
            })
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_info(&self, conn: &mut SqliteConnection) -> Result<PostInfo> {
        use crate::schema::posts::dsl::*;
        Ok(posts.filter(id.eq(&self.id)).first::<PostInfo>(conn)?)
    }

    /// Whether the given profile may edit or delete the post.
    pub fn writable_by(&self, conn: &mut SqliteConnection, profile: &ProfileInfo) -> Result<bool> {
        Ok(profile.is_admin() || self.get_info(conn)?.get_author_id() == profile.get_id())
    }

    fn association_columns(&self, conn: &mut SqliteConnection) -> Result<AssociationColumns> {
        use crate::schema::posts::dsl::*;
        let (store, club, range, servicing) = posts
            .filter(id.eq(&self.id))
            .select((store_id, club_id, range_id, servicing_id))
            .first::<(Option<String>, Option<String>, Option<String>, Option<String>)>(conn)?;
        Ok(AssociationColumns {
            store_id: store,
            club_id: club,
            range_id: range,
            servicing_id: servicing,
        })
    }

    /// Overwrite title, content, category and featured image with the form.
    ///
    /// The establishment columns are read again inside the same transaction and written back as
    /// they are, so an edit never drops the association even if the form predates a change to it.
    /// The slug follows the (possibly changed) title.
    pub fn update(&self, conn: &mut SqliteConnection, form: IncompletePost) -> Result<PostInfo> {
        let form = form.verify()?;
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::posts::dsl::*;
            let association = self.association_columns(conn)?;
            let new_slug = unique_slug(&form.title, |s| slug_taken(conn, s, Some(self.id.as_str())))?;
            diesel::update(posts.filter(id.eq(&self.id)))
                .set((
                    title.eq(&form.title),
                    slug.eq(&new_slug),
                    content.eq(&form.content),
                    category.eq(form.category),
                    published.eq(form.published),
                    featured_image.eq(form.featured_image.as_deref()),
                    store_id.eq(association.store_id.as_deref()),
                    club_id.eq(association.club_id.as_deref()),
                    range_id.eq(association.range_id.as_deref()),
                    servicing_id.eq(association.servicing_id.as_deref()),
                    updated_at.eq(now()),
                ))
                .execute(conn)?;
            self.get_info(conn)
        })
    }

    pub fn set_published(&self, conn: &mut SqliteConnection, value: bool) -> Result<PostInfo> {
        use crate::schema::posts::dsl::*;
        diesel::update(posts.filter(id.eq(&self.id)))
            .set(published.eq(value))
            .execute(conn)?;
        self.get_info(conn)
    }

    pub fn set_featured_image(
        &self,
        conn: &mut SqliteConnection,
        url: Option<&str>,
    ) -> Result<PostInfo> {
        use crate::schema::posts::dsl::*;
        diesel::update(posts.filter(id.eq(&self.id)))
            .set((featured_image.eq(url), updated_at.eq(now())))
            .execute(conn)?;
        self.get_info(conn)
    }

    // Counted in SQL so concurrent views never overwrite each other
    pub fn increment_views(&self, conn: &mut SqliteConnection) -> Result<()> {
        use crate::schema::posts::dsl::*;
        diesel::update(posts.filter(id.eq(&self.id)))
            .set(view_count.eq(view_count + 1))
            .execute(conn)?;
        Ok(())
    }

    pub fn delete(self, conn: &mut SqliteConnection) -> Result<usize> {
        use crate::schema::posts::dsl::*;
        Ok(diesel::delete(posts.filter(id.eq(&self.id))).execute(conn)?)
    }
}

/// The blog editor form
#[derive(Debug, Clone, FromForm, Serialize, Deserialize)]
pub struct IncompletePost {
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[field(default = false)]
    #[serde(default)]
    pub published: bool,
}

impl IncompletePost {
    pub fn new(title: impl ToString, content: impl ToString, category: PostCategory) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            category,
            featured_image: None,
            published: false,
        }
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn featured_image(mut self, url: impl ToString) -> Self {
        self.featured_image = Some(url.to_string());
        self
    }

    pub fn verify(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ArsenalDbError::MissingField("title"));
        }
        if self.content.trim().is_empty() {
            return Err(ArsenalDbError::MissingField("content"));
        }
        Ok(Self {
            title,
            featured_image: self
                .featured_image
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty()),
            ..self
        })
    }

    pub fn create(
        self,
        conn: &mut SqliteConnection,
        author: &ProfileId,
        association: Option<&Association>,
    ) -> Result<PostId> {
        use crate::schema::posts::dsl::*;
        let form = self.verify()?;
        let columns = AssociationColumns::from(association);
        let time = now();
        let info = PostInfo {
            id: Uuid::new_v4().to_string(),
            author_id: author.get_id().to_string(),
            slug: unique_slug(&form.title, |s| slug_taken(conn, s, None))?,
            title: form.title,
            content: form.content,
            category: form.category,
            published: form.published,
            view_count: 0,
            featured_image: form.featured_image,
            store_id: columns.store_id,
            club_id: columns.club_id,
            range_id: columns.range_id,
            servicing_id: columns.servicing_id,
            created_at: time,
            updated_at: time,
        };
        diesel::insert_into(posts).values(&info).execute(conn)?;
        Ok(info.to_id())
    }
}

/// A single post, corresponding to a row in the table `posts`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = posts)]
pub struct PostInfo {
    id: String,
    author_id: String,
    title: String,
    slug: String,
    content: String,
    category: PostCategory,
    published: bool,
    view_count: i64,
    featured_image: Option<String>,
    store_id: Option<String>,
    club_id: Option<String>,
    range_id: Option<String>,
    servicing_id: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl PostInfo {
    pub fn to_id(&self) -> PostId {
        PostId {
            id: self.id.clone(),
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_author_id(&self) -> &str {
        &self.author_id
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn get_slug(&self) -> &str {
        &self.slug
    }

    pub fn get_content(&self) -> &str {
        &self.content
    }

    pub fn get_category(&self) -> PostCategory {
        self.category
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn get_view_count(&self) -> i64 {
        self.view_count
    }

    pub fn get_featured_image(&self) -> Option<&str> {
        self.featured_image.as_deref()
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }

    pub fn get_updated_at(&self) -> &NaiveDateTime {
        &self.updated_at
    }

    pub fn get_association_columns(&self) -> AssociationColumns {
        AssociationColumns {
            store_id: self.store_id.clone(),
            club_id: self.club_id.clone(),
            range_id: self.range_id.clone(),
            servicing_id: self.servicing_id.clone(),
        }
    }

    pub fn get_association(&self) -> Result<Option<Association>> {
        self.get_association_columns().into_association()
    }

    // The form a post editor starts from
    pub fn to_form(&self) -> IncompletePost {
        IncompletePost {
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category,
            featured_image: self.featured_image.clone(),
            published: self.published,
        }
    }
}

type BoxedQuery<'a> = posts::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct PostFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> PostFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::posts::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: posts.into_boxed(),
            }
        }
    }

    pub fn list(conn: &'a mut SqliteConnection) -> Result<Vec<PostId>> {
        Self::new(conn, None).search()
    }

    pub fn list_info(conn: &'a mut SqliteConnection) -> Result<Vec<PostInfo>> {
        Self::new(conn, None).search_info()
    }

    /// Clear every association pointing at the establishment.
    pub fn detach_establishment(
        conn: &mut SqliteConnection,
        establishment: &EstablishmentId,
    ) -> Result<usize> {
        use crate::schema::posts::dsl::*;
        let target = establishment.get_id();
        let mut changed = 0;
        changed += diesel::update(posts.filter(store_id.eq(target)))
            .set(store_id.eq(None::<String>))
            .execute(conn)?;
        changed += diesel::update(posts.filter(club_id.eq(target)))
            .set(club_id.eq(None::<String>))
            .execute(conn)?;
        changed += diesel::update(posts.filter(range_id.eq(target)))
            .set(range_id.eq(None::<String>))
            .execute(conn)?;
        changed += diesel::update(posts.filter(servicing_id.eq(target)))
            .set(servicing_id.eq(None::<String>))
            .execute(conn)?;
        Ok(changed)
    }

    pub fn delete_by_author(conn: &mut SqliteConnection, author: &ProfileId) -> Result<usize> {
        use crate::schema::posts::dsl::*;
        Ok(diesel::delete(posts.filter(author_id.eq(author.get_id()))).execute(conn)?)
    }

    pub fn search(self) -> Result<Vec<PostId>> {
        use crate::schema::posts::dsl::*;
        Ok(self
            .query
            .select(id)
            .load::<String>(self.conn)?
            .into_iter()
            .map(|x| PostId { id: x })
            .collect())
    }

    // Newest first
    pub fn search_info(self) -> Result<Vec<PostInfo>> {
        use crate::schema::posts::dsl::*;
        Ok(self
            .query
            .order(created_at.desc())
            .load::<PostInfo>(self.conn)?)
    }

    pub fn first(self) -> Result<PostId> {
        use crate::schema::posts::dsl::*;
        Ok(PostId {
            id: self.query.select(id).first::<String>(self.conn)?,
        })
    }

    pub fn first_info(self) -> Result<PostInfo> {
        Ok(self.query.first::<PostInfo>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn id(mut self, id_provided: &'a str) -> Self {
        use crate::schema::posts::dsl::*;
        self.query = self.query.filter(id.eq(id_provided));
        self
    }

    pub fn slug(mut self, slug_provided: &'a str) -> Self {
        use crate::schema::posts::dsl::*;
        self.query = self.query.filter(slug.eq(slug_provided));
        self
    }

    pub fn author(mut self, author: &'a str) -> Self {
        use crate::schema::posts::dsl::*;
        self.query = self.query.filter(author_id.eq(author));
        self
    }

    pub fn published(mut self, value: bool) -> Self {
        use crate::schema::posts::dsl::*;
        self.query = self.query.filter(published.eq(value));
        self
    }

    pub fn category(mut self, value: PostCategory) -> Self {
        use crate::schema::posts::dsl::*;
        self.query = self.query.filter(category.eq(value));
        self
    }

    pub fn association(mut self, value: &'a Association) -> Self {
        use crate::schema::posts::dsl::*;
        let target = value.establishment_id();
        self.query = match value {
            Association::Store(_) => self.query.filter(store_id.eq(target)),
            Association::Club(_) => self.query.filter(club_id.eq(target)),
            Association::Range(_) => self.query.filter(range_id.eq(target)),
            Association::Servicing(_) => self.query.filter(servicing_id.eq(target)),
        };
        self
    }
}

#[cfg(test)]
mod tests;
