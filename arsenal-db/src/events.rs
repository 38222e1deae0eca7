use crate::{
    credits::CreditTransactions,
    error::{ArsenalDbError, ArsenalDbResult as Result},
    now,
    profiles::{ProfileId, ProfileInfo},
    schema::events,
    slugs::unique_slug,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::{prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn slug_taken(conn: &mut SqliteConnection, candidate: &str, except: Option<&str>) -> Result<bool> {
    use crate::schema::events::dsl::*;
    let mut query = events.filter(slug.eq(candidate)).into_boxed();
    if let Some(except) = except {
        query = query.filter(id.ne(except));
    }
    Ok(query.count().get_result::<i64>(conn)? > 0)
}

/// The ID referencing a single event
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = events)]
pub struct EventId {
    id: String,
}

impl EventId {
    pub fn find(conn: &mut SqliteConnection, id_provided: &str) -> Result<Self> {
        EventFinder::new(conn, None)
            .id(id_provided)
            .first()
            .map_err(|e| match e {
                ArsenalDbError::QueryError(diesel::result::Error::NotFound) => {
                    ArsenalDbError::EventNotFound
                }
                e => e,
            })
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_info(&self, conn: &mut SqliteConnection) -> Result<EventInfo> {
        use crate::schema::events::dsl::*;
        Ok(events.filter(id.eq(&self.id)).first::<EventInfo>(conn)?)
    }

    pub fn writable_by(&self, conn: &mut SqliteConnection, profile: &ProfileInfo) -> Result<bool> {
        Ok(profile.is_admin() || self.get_info(conn)?.get_created_by() == profile.get_id())
    }

    // Editing an event is free; only creation costs credits.
    pub fn update(&self, conn: &mut SqliteConnection, form: IncompleteEvent) -> Result<EventInfo> {
        let form = form.verify()?;
        let mut info = self.get_info(conn)?;
        if info.title != form.title {
            info.slug = unique_slug(&form.title, |s| slug_taken(conn, s, Some(self.id.as_str())))?;
        }
        info.title = form.title;
        info.description = form.description;
        info.location = form.location;
        info.start_date = form.start_date;
        info.start_time = form.start_time;
        info.end_date = form.end_date;
        info.end_time = form.end_time;
        info.price = form.price;
        info.update(conn)
    }

    pub fn delete(self, conn: &mut SqliteConnection) -> Result<usize> {
        use crate::schema::events::dsl::*;
        Ok(diesel::delete(events.filter(id.eq(&self.id))).execute(conn)?)
    }
}

/// The event creation form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub price: Option<i64>,
}

impl IncompleteEvent {
    pub fn new(
        title: impl ToString,
        location: impl ToString,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            location: location.to_string(),
            start_date,
            start_time: None,
            end_date,
            end_time: None,
            price: None,
        }
    }

    pub fn description(mut self, description: impl ToString) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn times(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn verify(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let location = self.location.trim().to_string();
        if title.is_empty() {
            return Err(ArsenalDbError::MissingField("title"));
        }
        if location.is_empty() {
            return Err(ArsenalDbError::MissingField("location"));
        }
        if self.end_date < self.start_date {
            return Err(ArsenalDbError::InvalidEventDates);
        }
        if let (true, Some(start), Some(end)) =
            (self.end_date == self.start_date, self.start_time, self.end_time)
        {
            if end < start {
                return Err(ArsenalDbError::InvalidEventDates);
            }
        }
        if matches!(self.price, Some(p) if p < 0) {
            return Err(ArsenalDbError::InvalidPrice);
        }
        Ok(Self {
            title,
            location,
            description: self.description.trim().to_string(),
            ..self
        })
    }

    /// Create the event, charging the creator `cost` credits in the same transaction.
    ///
    /// If the creator cannot afford it, nothing is written.
    pub fn create(
        self,
        conn: &mut SqliteConnection,
        creator: &ProfileId,
        cost: i64,
    ) -> Result<EventId> {
        let form = self.verify()?;
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::events::dsl::*;
            if cost > 0 {
                CreditTransactions::consume(
                    conn,
                    creator,
                    cost,
                    &format!("event: {}", form.title),
                )?;
            }
            let info = EventInfo {
                id: Uuid::new_v4().to_string(),
                created_by: creator.get_id().to_string(),
                slug: unique_slug(&form.title, |s| slug_taken(conn, s, None))?,
                title: form.title,
                description: form.description,
                location: form.location,
                start_date: form.start_date,
                start_time: form.start_time,
                end_date: form.end_date,
                end_time: form.end_time,
                price: form.price,
                poster_url: None,
                created_at: now(),
            };
            diesel::insert_into(events).values(&info).execute(conn)?;
            Ok(info.to_id())
        })
    }
}

/// A single event, corresponding to a row in the table `events`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = events)]
pub struct EventInfo {
    id: String,
    created_by: String,
    title: String,
    description: String,
    location: String,
    start_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_date: NaiveDate,
    end_time: Option<NaiveTime>,
    price: Option<i64>,
    poster_url: Option<String>,
    slug: String,
    created_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = events, treat_none_as_null = true)]
struct EventChanges<'a> {
    title: &'a str,
    description: &'a str,
    location: &'a str,
    start_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_date: NaiveDate,
    end_time: Option<NaiveTime>,
    price: Option<i64>,
    poster_url: Option<&'a str>,
    slug: &'a str,
}

impl EventInfo {
    pub fn update(self, conn: &mut SqliteConnection) -> Result<Self> {
        use crate::schema::events::dsl::*;
        diesel::update(events.filter(id.eq(&self.id)))
            .set(EventChanges {
                title: &self.title,
                description: &self.description,
                location: &self.location,
                start_date: self.start_date,
                start_time: self.start_time,
                end_date: self.end_date,
                end_time: self.end_time,
                price: self.price,
                poster_url: self.poster_url.as_deref(),
                slug: &self.slug,
            })
            .execute(conn)?;
        self.to_id().get_info(conn)
    }

    pub fn to_id(&self) -> EventId {
        EventId {
            id: self.id.clone(),
        }
    }

    /// Whether the event takes place (at least partly) on the given day.
    pub fn spans(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_created_by(&self) -> &str {
        &self.created_by
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn get_start_time(&self) -> Option<NaiveTime> {
        self.start_time
    }

    pub fn get_end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn get_end_time(&self) -> Option<NaiveTime> {
        self.end_time
    }

    pub fn get_price(&self) -> Option<i64> {
        self.price
    }

    pub fn get_poster_url(&self) -> Option<&str> {
        self.poster_url.as_deref()
    }

    pub fn get_slug(&self) -> &str {
        &self.slug
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }

    pub fn set_poster_url(mut self, url: impl ToString) -> Self {
        self.poster_url = Some(url.to_string());
        self
    }

    // The form an event editor starts from
    pub fn to_form(&self) -> IncompleteEvent {
        IncompleteEvent {
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            start_date: self.start_date,
            start_time: self.start_time,
            end_date: self.end_date,
            end_time: self.end_time,
            price: self.price,
        }
    }
}

type BoxedQuery<'a> = events::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct EventFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> EventFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::events::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: events.into_boxed(),
            }
        }
    }

    pub fn list(conn: &'a mut SqliteConnection) -> Result<Vec<EventId>> {
        Self::new(conn, None).search()
    }

    pub fn list_info(conn: &'a mut SqliteConnection) -> Result<Vec<EventInfo>> {
        Self::new(conn, None).search_info()
    }

    pub fn delete_by_creator(conn: &mut SqliteConnection, creator: &ProfileId) -> Result<usize> {
        use crate::schema::events::dsl::*;
        Ok(diesel::delete(events.filter(created_by.eq(creator.get_id()))).execute(conn)?)
    }

    pub fn search(self) -> Result<Vec<EventId>> {
        use crate::schema::events::dsl::*;
        Ok(self
            .query
            .select(id)
            .load::<String>(self.conn)?
            .into_iter()
            .map(|x| EventId { id: x })
            .collect())
    }

    // Chronological
    pub fn search_info(self) -> Result<Vec<EventInfo>> {
        use crate::schema::events::dsl::*;
        Ok(self
            .query
            .order((start_date.asc(), start_time.asc()))
            .load::<EventInfo>(self.conn)?)
    }

    pub fn first(self) -> Result<EventId> {
        use crate::schema::events::dsl::*;
        Ok(EventId {
            id: self.query.select(id).first::<String>(self.conn)?,
        })
    }

    pub fn first_info(self) -> Result<EventInfo> {
        Ok(self.query.first::<EventInfo>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn id(mut self, id_provided: &'a str) -> Self {
        use crate::schema::events::dsl::*;
        self.query = self.query.filter(id.eq(id_provided));
        self
    }

    pub fn slug(mut self, slug_provided: &'a str) -> Self {
        use crate::schema::events::dsl::*;
        self.query = self.query.filter(slug.eq(slug_provided));
        self
    }

    pub fn creator(mut self, creator: &'a str) -> Self {
        use crate::schema::events::dsl::*;
        self.query = self.query.filter(created_by.eq(creator));
        self
    }

    /// Events taking place on at least one day of `[from, to]`
    pub fn overlapping(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        use crate::schema::events::dsl::*;
        self.query = self
            .query
            .filter(start_date.le(to))
            .filter(end_date.ge(from));
        self
    }

    pub fn upcoming(mut self, today: NaiveDate) -> Self {
        use crate::schema::events::dsl::*;
        self.query = self.query.filter(end_date.ge(today));
        self
    }
}
