use crate::{
    infras::{
        basics::{Choice, Dollars, Msg},
        guards::*,
    },
    table::{Direction, SortKey, SortState, Sortable, Table},
    DbConn, IntoFlash,
};
use arsenal_db::{
    enums::{EstablishmentKind, ListingStatus},
    error::ArsenalDbError,
    establishments::{EstablishmentFinder, EstablishmentInfo},
    events::{EventFinder, EventInfo},
    listings::{ListingFinder, ListingInfo},
    posts::{PostFinder, PostInfo},
    profiles::{ProfileFinder, ProfileInfo, ProfileStats},
};
use askama::Template;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};
use std::{cmp::Ordering, collections::HashMap};

// Admin pages fall back to the dashboard, the dashboard to the index
fn dashboard_uri() -> rocket::http::uri::Origin<'static> {
    uri!("/admin", dashboard)
}

// Builds id -> email for the owner columns
fn emails(c: &mut diesel::SqliteConnection) -> Result<HashMap<String, String>, ArsenalDbError> {
    Ok(ProfileFinder::list_info(c)?
        .into_iter()
        .map(|p| (p.get_id().to_string(), p.get_email().to_string()))
        .collect())
}

fn owner_email(emails: &HashMap<String, String>, id: &str) -> String {
    emails.get(id).cloned().unwrap_or_default()
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardPage {
    inner: Msg,
    stats: ProfileStats,
    establishments: i64,
    listings: i64,
    events: i64,
    posts: i64,
}

#[get("/")]
pub async fn dashboard(
    _role: Role<Admin>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<DashboardPage, Flash<Redirect>> {
    let (stats, establishments, listings, events, posts) = conn
        .run(|c| -> Result<_, ArsenalDbError> {
            Ok((
                ProfileFinder::stats(c)?,
                EstablishmentFinder::new(c, None).count()?,
                ListingFinder::new(c, None).count()?,
                EventFinder::new(c, None).count()?,
                PostFinder::new(c, None).count()?,
            ))
        })
        .await
        .into_flash(uri!("/"))?;
    Ok(DashboardPage {
        inner: Msg::from_flash(flash),
        stats,
        establishments,
        listings,
        events,
        posts,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum UserKey {
    Email,
    Username,
    Credits,
    Created,
}

impl SortKey for UserKey {
    const ALL: &'static [Self] = &[Self::Email, Self::Username, Self::Credits, Self::Created];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Username => "username",
            Self::Credits => "credits",
            Self::Created => "created",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Username => "Username",
            Self::Credits => "Credits",
            Self::Created => "Joined",
        }
    }
}

pub struct UserRow {
    pub user: ProfileInfo,
}

impl Sortable for UserRow {
    type Key = UserKey;

    fn compare(&self, other: &Self, key: UserKey) -> Ordering {
        let (a, b) = (&self.user, &other.user);
        match key {
            UserKey::Email => a.get_email().cmp(b.get_email()),
            UserKey::Username => a
                .get_username()
                .to_lowercase()
                .cmp(&b.get_username().to_lowercase()),
            UserKey::Credits => a.get_credits().cmp(&b.get_credits()),
            UserKey::Created => a.get_created_at().cmp(b.get_created_at()),
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.user.get_email(),
            self.user.get_username(),
            self.user.get_notes().unwrap_or_default()
        )
    }
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct UsersPage {
    inner: Msg,
    me: ProfileInfo,
    table: Table<UserRow>,
}

#[get("/users?<sort>&<dir>&<q>")]
pub async fn users(
    _role: Role<Admin>,
    me: ProfileInfoGuard<Cookie>,
    sort: Option<UserKey>,
    dir: Option<Direction>,
    q: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<UsersPage, Flash<Redirect>> {
    let users = conn
        .run(|c| ProfileFinder::list_info(c))
        .await
        .into_flash(dashboard_uri())?;
    let rows = users.into_iter().map(|user| UserRow { user }).collect();
    Ok(UsersPage {
        inner: Msg::from_flash(flash),
        me: me.info,
        table: Table::new(rows, SortState::new(sort, dir), q),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum EstablishmentKey {
    Name,
    Location,
    Owner,
    Created,
}

impl SortKey for EstablishmentKey {
    const ALL: &'static [Self] = &[Self::Name, Self::Location, Self::Owner, Self::Created];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Location => "location",
            Self::Owner => "owner",
            Self::Created => "created",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Location => "Location",
            Self::Owner => "Owner",
            Self::Created => "Created",
        }
    }
}

pub struct EstablishmentRow {
    pub establishment: EstablishmentInfo,
    pub owner: String,
}

impl Sortable for EstablishmentRow {
    type Key = EstablishmentKey;

    fn compare(&self, other: &Self, key: EstablishmentKey) -> Ordering {
        let (a, b) = (&self.establishment, &other.establishment);
        match key {
            EstablishmentKey::Name => a
                .get_business_name()
                .to_lowercase()
                .cmp(&b.get_business_name().to_lowercase()),
            EstablishmentKey::Location => a.get_location().cmp(b.get_location()),
            EstablishmentKey::Owner => self.owner.cmp(&other.owner),
            EstablishmentKey::Created => a.get_created_at().cmp(b.get_created_at()),
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.establishment.get_business_name(),
            self.establishment.get_location(),
            self.owner
        )
    }
}

#[derive(Template)]
#[template(path = "admin/establishments.html")]
pub struct EstablishmentsPage {
    inner: Msg,
    kind: Option<EstablishmentKind>,
    kinds: Vec<Choice>,
    table: Table<EstablishmentRow>,
}

#[get("/establishments?<kind>&<sort>&<dir>&<q>")]
pub async fn establishments(
    _role: Role<Admin>,
    kind: Option<EstablishmentKind>,
    sort: Option<EstablishmentKey>,
    dir: Option<Direction>,
    q: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EstablishmentsPage, Flash<Redirect>> {
    let rows = conn
        .run(move |c| -> Result<Vec<EstablishmentRow>, ArsenalDbError> {
            let emails = emails(c)?;
            let mut finder = EstablishmentFinder::new(c, None);
            if let Some(kind) = kind {
                finder = finder.kind(kind);
            }
            Ok(finder
                .search_info()?
                .into_iter()
                .map(|establishment| EstablishmentRow {
                    owner: owner_email(&emails, establishment.get_owner_id()),
                    establishment,
                })
                .collect())
        })
        .await
        .into_flash(dashboard_uri())?;
    let base = kind
        .map(|k| format!("kind={}&", k.as_str()))
        .unwrap_or_default();
    Ok(EstablishmentsPage {
        inner: Msg::from_flash(flash),
        kind,
        kinds: Choice::list(EstablishmentKind::ALL, kind, EstablishmentKind::as_str),
        table: Table::new(rows, SortState::new(sort, dir), q).with_base(base),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ListingKey {
    Title,
    Price,
    Status,
    Seller,
    Created,
}

impl SortKey for ListingKey {
    const ALL: &'static [Self] = &[Self::Title, Self::Price, Self::Status, Self::Seller, Self::Created];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Status => "status",
            Self::Seller => "seller",
            Self::Created => "created",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Price => "Price",
            Self::Status => "Status",
            Self::Seller => "Seller",
            Self::Created => "Listed",
        }
    }
}

pub struct ListingRow {
    pub listing: ListingInfo,
    pub seller: String,
}

impl ListingRow {
    pub fn statuses(&self) -> Vec<Choice> {
        Choice::list(
            ListingStatus::ALL,
            Some(self.listing.get_status()),
            ListingStatus::as_str,
        )
    }
}

impl Sortable for ListingRow {
    type Key = ListingKey;

    fn compare(&self, other: &Self, key: ListingKey) -> Ordering {
        let (a, b) = (&self.listing, &other.listing);
        match key {
            ListingKey::Title => a.get_title().to_lowercase().cmp(&b.get_title().to_lowercase()),
            ListingKey::Price => a.get_price().cmp(&b.get_price()),
            ListingKey::Status => a.get_status().as_str().cmp(b.get_status().as_str()),
            ListingKey::Seller => self.seller.cmp(&other.seller),
            ListingKey::Created => a.get_created_at().cmp(b.get_created_at()),
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.listing.get_title(),
            self.listing.get_category(),
            self.seller
        )
    }
}

#[derive(Template)]
#[template(path = "admin/listings.html")]
pub struct ListingsPage {
    inner: Msg,
    table: Table<ListingRow>,
}

#[get("/listings?<sort>&<dir>&<q>")]
pub async fn listings(
    _role: Role<Admin>,
    sort: Option<ListingKey>,
    dir: Option<Direction>,
    q: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<ListingsPage, Flash<Redirect>> {
    let rows = conn
        .run(|c| -> Result<Vec<ListingRow>, ArsenalDbError> {
            let emails = emails(c)?;
            Ok(ListingFinder::list_info(c)?
                .into_iter()
                .map(|listing| ListingRow {
                    seller: owner_email(&emails, listing.get_seller_id()),
                    listing,
                })
                .collect())
        })
        .await
        .into_flash(dashboard_uri())?;
    Ok(ListingsPage {
        inner: Msg::from_flash(flash),
        table: Table::new(rows, SortState::new(sort, dir), q),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum EventKey {
    Title,
    Location,
    Start,
}

impl SortKey for EventKey {
    const ALL: &'static [Self] = &[Self::Title, Self::Location, Self::Start];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Location => "location",
            Self::Start => "start",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Location => "Location",
            Self::Start => "Starts",
        }
    }
}

pub struct EventRow {
    pub event: EventInfo,
    pub creator: String,
}

impl Sortable for EventRow {
    type Key = EventKey;

    fn compare(&self, other: &Self, key: EventKey) -> Ordering {
        let (a, b) = (&self.event, &other.event);
        match key {
            EventKey::Title => a.get_title().to_lowercase().cmp(&b.get_title().to_lowercase()),
            EventKey::Location => a.get_location().cmp(b.get_location()),
            EventKey::Start => (a.get_start_date(), a.get_start_time())
                .cmp(&(b.get_start_date(), b.get_start_time())),
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.event.get_title(),
            self.event.get_location(),
            self.creator
        )
    }
}

#[derive(Template)]
#[template(path = "admin/events.html")]
pub struct EventsPage {
    inner: Msg,
    table: Table<EventRow>,
}

#[get("/events?<sort>&<dir>&<q>")]
pub async fn events(
    _role: Role<Admin>,
    sort: Option<EventKey>,
    dir: Option<Direction>,
    q: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EventsPage, Flash<Redirect>> {
    let rows = conn
        .run(|c| -> Result<Vec<EventRow>, ArsenalDbError> {
            let emails = emails(c)?;
            Ok(EventFinder::list_info(c)?
                .into_iter()
                .map(|event| EventRow {
                    creator: owner_email(&emails, event.get_created_by()),
                    event,
                })
                .collect())
        })
        .await
        .into_flash(dashboard_uri())?;
    Ok(EventsPage {
        inner: Msg::from_flash(flash),
        table: Table::new(rows, SortState::new(sort, dir), q),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum PostKey {
    Title,
    Author,
    Views,
    Created,
}

impl SortKey for PostKey {
    const ALL: &'static [Self] = &[Self::Title, Self::Author, Self::Views, Self::Created];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Views => "views",
            Self::Created => "created",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Views => "Views",
            Self::Created => "Created",
        }
    }
}

pub struct PostRow {
    pub post: PostInfo,
    pub author: String,
}

impl Sortable for PostRow {
    type Key = PostKey;

    fn compare(&self, other: &Self, key: PostKey) -> Ordering {
        let (a, b) = (&self.post, &other.post);
        match key {
            PostKey::Title => a.get_title().to_lowercase().cmp(&b.get_title().to_lowercase()),
            PostKey::Author => self.author.cmp(&other.author),
            PostKey::Views => a.get_view_count().cmp(&b.get_view_count()),
            PostKey::Created => a.get_created_at().cmp(b.get_created_at()),
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.post.get_title(),
            self.post.get_category(),
            self.author
        )
    }
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
pub struct PostsPage {
    inner: Msg,
    table: Table<PostRow>,
}

#[get("/posts?<sort>&<dir>&<q>")]
pub async fn posts(
    _role: Role<Admin>,
    sort: Option<PostKey>,
    dir: Option<Direction>,
    q: Option<String>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<PostsPage, Flash<Redirect>> {
    let rows = conn
        .run(|c| -> Result<Vec<PostRow>, ArsenalDbError> {
            let emails = emails(c)?;
            Ok(PostFinder::list_info(c)?
                .into_iter()
                .map(|post| PostRow {
                    author: owner_email(&emails, post.get_author_id()),
                    post,
                })
                .collect())
        })
        .await
        .into_flash(dashboard_uri())?;
    Ok(PostsPage {
        inner: Msg::from_flash(flash),
        table: Table::new(rows, SortState::new(sort, dir), q),
    })
}
