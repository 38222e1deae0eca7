use crate::{
    infras::{
        basics::{Dollars, Msg},
        guards::*,
    },
    DbConn, IntoFlash,
};
use arsenal_db::{
    credits::{CreditTransaction, CreditTransactionFinder},
    error::ArsenalDbError,
    establishments::{EstablishmentFinder, EstablishmentInfo},
    events::{EventFinder, EventInfo},
    listings::{ListingFinder, ListingInfo},
    posts::{PostFinder, PostInfo},
    profiles::ProfileInfo,
};
use askama::Template;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};

#[derive(Template)]
#[template(path = "user/login.html")]
pub struct LoginPage {
    inner: Msg,
}

#[get("/login")]
pub async fn login_page(flash: Option<FlashMessage<'_>>) -> LoginPage {
    LoginPage {
        inner: Msg::from_flash(flash),
    }
}

#[derive(Template)]
#[template(path = "user/register.html")]
pub struct RegisterPage {
    inner: Msg,
}

#[get("/register")]
pub async fn register_page(flash: Option<FlashMessage<'_>>) -> RegisterPage {
    RegisterPage {
        inner: Msg::from_flash(flash),
    }
}

#[derive(Template)]
#[template(path = "user/portal.html")]
pub struct PortalPage {
    inner: Msg,
    user: ProfileInfo,
    establishments: Vec<EstablishmentInfo>,
    listings: Vec<ListingInfo>,
    posts: Vec<PostInfo>,
    events: Vec<EventInfo>,
    ledger: Vec<CreditTransaction>,
}

// The flash message is required here because we may get error from update_profile
#[get("/", rank = 1)]
pub async fn portal(
    user: ProfileInfoGuard<Cookie>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<PortalPage, Flash<Redirect>> {
    let uid = user.info.get_id().to_string();
    let (establishments, listings, posts, events, ledger) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let establishments = EstablishmentFinder::new(c, None).owner(&uid).search_info()?;
            let listings = ListingFinder::new(c, None).seller(&uid).search_info()?;
            let posts = PostFinder::new(c, None).author(&uid).search_info()?;
            let events = EventFinder::new(c, None).creator(&uid).search_info()?;
            let ledger = CreditTransactionFinder::new(c, None).profile(&uid).search()?;
            Ok((establishments, listings, posts, events, ledger))
        })
        .await
        .into_flash(uri!("/"))?;

    Ok(PortalPage {
        inner: Msg::from_flash(flash),
        user: user.info,
        establishments,
        listings,
        posts,
        events,
        ledger,
    })
}

#[get("/", rank = 2)]
pub async fn portal_unsigned() -> Redirect {
    Redirect::to(uri!("/user", login_page))
}
