use crate::{
    infras::{
        database::CreditPolicy,
        guards::*,
        storage::{Bucket, ObjectStorage, Storage},
    },
    pages::events::*,
    parse_cents,
    services::establishments::ImageForm,
    DbConn, IntoFlash,
};
use arsenal_db::{
    error::ArsenalDbError,
    events::{EventId, IncompleteEvent},
};
use chrono::{NaiveDate, NaiveTime};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    State,
};

/// The event form as typed in the browser. Dates are `YYYY-MM-DD`, times `HH:MM`.
#[derive(Debug, FromForm, Clone)]
pub struct EventForm {
    pub title: String,
    #[field(default = String::new())]
    pub description: String,
    pub location: String,
    pub start_date: String,
    #[field(default = String::new())]
    pub start_time: String,
    #[field(default = String::new())]
    pub end_date: String,
    #[field(default = String::new())]
    pub end_time: String,
    #[field(default = String::new())]
    pub price: String,
}

fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, ArsenalDbError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ArsenalDbError::MissingField(field))
}

fn parse_time(value: &str) -> Result<Option<NaiveTime>, ArsenalDbError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| ArsenalDbError::InvalidEventDates)
}

impl EventForm {
    // A blank end date means a single-day event
    pub fn to_incomplete(&self) -> Result<IncompleteEvent, ArsenalDbError> {
        let start_date = parse_date(&self.start_date, "start date")?;
        let end_date = if self.end_date.trim().is_empty() {
            start_date
        } else {
            parse_date(&self.end_date, "end date")?
        };
        let mut event = IncompleteEvent::new(&self.title, &self.location, start_date, end_date)
            .description(&self.description)
            .times(parse_time(&self.start_time)?, parse_time(&self.end_time)?);
        if !self.price.trim().is_empty() {
            event = event.price(parse_cents(&self.price).ok_or(ArsenalDbError::InvalidPrice)?);
        }
        Ok(event)
    }
}

// Creation is charged in credits, in the same transaction as the insert
#[post("/new", data = "<info>")]
pub async fn create_event(
    user: ProfileIdGuard<Cookie>,
    info: Form<EventForm>,
    policy: &State<CreditPolicy>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let cost = policy.event_cost;
    let event = info.to_incomplete().into_flash(uri!("/events", new_event_page))?;
    let created = conn
        .run(move |c| event.create(c, &user.id, cost)?.get_info(c))
        .await
        .into_flash(uri!("/events", new_event_page))?;
    Ok(Redirect::to(uri!("/events", event_page(created.get_slug()))))
}

#[post("/edit?<event_id>", data = "<info>")]
pub async fn update_event(
    _auth: Auth<EventWritable>,
    event_id: String,
    info: Form<EventForm>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = uri!("/events", edit_event_page(event_id.as_str()));
    let event = info.to_incomplete().into_flash(back.clone())?;
    let updated = conn
        .run(move |c| EventId::find(c, &event_id)?.update(c, event))
        .await
        .into_flash(back)?;
    Ok(Redirect::to(uri!("/events", event_page(updated.get_slug()))))
}

#[post("/poster?<event_id>", data = "<form>")]
pub async fn upload_poster(
    _auth: Auth<EventWritable>,
    user: ProfileIdGuard<Cookie>,
    event_id: String,
    form: Form<ImageForm>,
    storage: &State<Storage>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = uri!("/events", edit_event_page(event_id.as_str()));
    let image = form.into_inner().image.validate().into_flash(back.clone())?;
    let url = storage
        .put(Bucket::Events, None, user.id.get_id(), image.object)
        .await
        .into_flash(back.clone())?;
    let updated = conn
        .run(move |c| {
            EventId::find(c, &event_id)?
                .get_info(c)?
                .set_poster_url(url)
                .update(c)
        })
        .await
        .into_flash(back)?;
    Ok(Redirect::to(uri!("/events", event_page(updated.get_slug()))))
}

#[get("/delete?<event_id>")]
pub async fn delete_event(
    _auth: Auth<EventWritable>,
    event_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| EventId::find(c, &event_id)?.delete(c))
        .await
        .into_flash(uri!("/events", calendar_page(_, _)))?;
    Ok(Flash::success(
        Redirect::to(uri!("/events", calendar_page(_, _))),
        "The event has been deleted",
    ))
}
