use crate::{
    calendar::MonthGrid,
    infras::{
        basics::{Dollars, Msg},
        database::CreditPolicy,
        guards::*,
    },
    DbConn, IntoFlash,
};
use arsenal_db::{
    error::ArsenalDbError,
    events::{EventFinder, EventId, EventInfo},
};
use askama::Template;
use chrono::{Datelike, Utc};
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
    State,
};

#[derive(Template)]
#[template(path = "events/calendar.html")]
pub struct CalendarPage {
    inner: Msg,
    grid: MonthGrid,
    upcoming: Vec<EventInfo>,
}

impl CalendarPage {
    fn prev_href(&self) -> String {
        let (year, month) = self.grid.prev();
        format!("/events?year={}&month={}", year, month)
    }

    fn next_href(&self) -> String {
        let (year, month) = self.grid.next();
        format!("/events?year={}&month={}", year, month)
    }
}

// The current month unless another one is asked for
#[get("/?<year>&<month>")]
pub async fn calendar_page(
    year: Option<i32>,
    month: Option<u32>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<CalendarPage, Flash<Redirect>> {
    let today = Utc::now().date_naive();
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    let (start, end) = MonthGrid::bounds(year, month)
        .ok_or("No such month")
        .into_flash(uri!("/"))?;

    let (events, mut upcoming) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let events = EventFinder::new(c, None)
                .overlapping(start, end)
                .search_info()?;
            let upcoming = EventFinder::new(c, None).upcoming(today).search_info()?;
            Ok((events, upcoming))
        })
        .await
        .into_flash(uri!("/"))?;
    upcoming.truncate(10);

    let grid = MonthGrid::new(year, month, &events)
        .ok_or("No such month")
        .into_flash(uri!("/"))?;
    Ok(CalendarPage {
        inner: Msg::from_flash(flash),
        grid,
        upcoming,
    })
}

#[derive(Template)]
#[template(path = "events/event.html")]
pub struct EventPage {
    inner: Msg,
    event: EventInfo,
    writable: bool,
}

#[get("/<slug>", rank = 3)]
pub async fn event_page(
    slug: String,
    viewer: Option<ProfileInfoGuard<Cookie>>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EventPage, Flash<Redirect>> {
    let event = conn
        .run(move |c| {
            EventFinder::new(c, None)
                .slug(&slug)
                .first_info()
                .map_err(|_| ArsenalDbError::EventNotFound)
        })
        .await
        .into_flash(uri!("/events", calendar_page(_, _)))?;
    let writable = viewer
        .map(|v| v.info.is_admin() || v.info.get_id() == event.get_created_by())
        .unwrap_or(false);
    Ok(EventPage {
        inner: Msg::from_flash(flash),
        event,
        writable,
    })
}

#[derive(Template)]
#[template(path = "events/form.html")]
pub struct EventFormPage {
    inner: Msg,
    event: Option<EventInfo>,
    cost: i64,
    credits: i64,
}

#[get("/new")]
pub async fn new_event_page(
    user: ProfileInfoGuard<Cookie>,
    policy: &State<CreditPolicy>,
    flash: Option<FlashMessage<'_>>,
) -> EventFormPage {
    EventFormPage {
        inner: Msg::from_flash(flash),
        event: None,
        cost: policy.event_cost,
        credits: user.info.get_credits(),
    }
}

#[get("/edit?<event_id>")]
pub async fn edit_event_page(
    _auth: Auth<EventWritable>,
    user: ProfileInfoGuard<Cookie>,
    event_id: String,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EventFormPage, Flash<Redirect>> {
    let event = conn
        .run(move |c| EventId::find(c, &event_id)?.get_info(c))
        .await
        .into_flash(uri!("/events", calendar_page(_, _)))?;
    Ok(EventFormPage {
        inner: Msg::from_flash(flash),
        event: Some(event),
        // Editing is free
        cost: 0,
        credits: user.info.get_credits(),
    })
}
