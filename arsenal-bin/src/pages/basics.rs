use crate::{
    infras::{
        basics::{Dollars, Msg, StaticFile},
        guards::DisabledAccount,
    },
    DbConn, IntoFlash,
};
use arsenal_db::{
    error::ArsenalDbError,
    events::{EventFinder, EventInfo},
    listings::{ListingFinder, ListingInfo, ListingOrder},
    posts::{PostFinder, PostInfo},
    Order,
};
use askama::Template;
use chrono::Utc;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
    Request,
};
use std::path::PathBuf;

#[derive(Template)]
#[template(path = "index.html")]
pub struct Index {
    inner: Msg,
    posts: Vec<PostInfo>,
    events: Vec<EventInfo>,
    listings: Vec<ListingInfo>,
}

#[get("/")]
pub async fn index(flash: Option<FlashMessage<'_>>, conn: DbConn) -> Result<Index, Flash<Redirect>> {
    let (posts, events, listings) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let now = Utc::now().naive_utc();
            let mut posts = PostFinder::new(c, None).published(true).search_info()?;
            posts.truncate(5);
            let mut events = EventFinder::new(c, None)
                .upcoming(now.date())
                .search_info()?;
            events.truncate(5);
            let mut listings = ListingFinder::new(c, None)
                .visible(now)
                .order_by(ListingOrder::Date, Order::Desc)
                .search_info()?;
            listings.truncate(4);
            Ok((posts, events, listings))
        })
        .await
        .into_flash(uri!("/static/500.html"))?;

    Ok(Index {
        inner: Msg::from_flash(flash),
        posts,
        events,
        listings,
    })
}

#[get("/<path..>")]
pub async fn get_file(path: PathBuf) -> StaticFile {
    StaticFile(path)
}

#[get("/favicon.ico")]
pub async fn get_icon() -> Redirect {
    Redirect::to(uri!("/static/favicon.ico"))
}

#[catch(401)]
pub async fn page401() -> Flash<Redirect> {
    Flash::error(Redirect::to("/user/login"), "Please sign in to continue")
}

// Sessions of disabled accounts are cleared by the guard, send them to sign in again
#[catch(403)]
pub async fn page403(request: &Request<'_>) -> Flash<Redirect> {
    if request.local_cache(DisabledAccount::default).0 {
        Flash::error(
            Redirect::to("/user/login"),
            "Your account has been disabled",
        )
    } else {
        Flash::error(Redirect::to("/"), "You are not permitted to do that")
    }
}

#[catch(404)]
pub async fn page404() -> Redirect {
    Redirect::to("/static/404.html")
}

#[catch(422)]
pub async fn page422() -> Redirect {
    Redirect::to("/static/422.html")
}

#[catch(500)]
pub async fn page500() -> Redirect {
    Redirect::to("/static/500.html")
}
