use crate::{
    infras::{
        basics::{Choice, Msg},
        guards::*,
    },
    DbConn, IntoFlash,
};
use arsenal_db::{
    enums::EstablishmentKind,
    error::ArsenalDbError,
    establishments::{EstablishmentFinder, EstablishmentId, EstablishmentInfo},
    posts::{Association, PostFinder, PostInfo},
};
use askama::Template;
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};

#[derive(Template)]
#[template(path = "establishments/directory.html")]
pub struct DirectoryPage {
    inner: Msg,
    kinds: Vec<(EstablishmentKind, i64)>,
}

#[get("/")]
pub async fn directory(
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<DirectoryPage, Flash<Redirect>> {
    let kinds = conn
        .run(|c| -> Result<_, ArsenalDbError> {
            EstablishmentKind::ALL
                .iter()
                .map(|k| Ok((*k, EstablishmentFinder::new(c, None).kind(*k).count()?)))
                .collect()
        })
        .await
        .into_flash(uri!("/"))?;
    Ok(DirectoryPage {
        inner: Msg::from_flash(flash),
        kinds,
    })
}

#[derive(Template)]
#[template(path = "establishments/kind.html")]
pub struct KindPage {
    inner: Msg,
    kind: EstablishmentKind,
    establishments: Vec<EstablishmentInfo>,
}

#[get("/<kind>", rank = 3)]
pub async fn kind_page(
    kind: &str,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<KindPage, Flash<Redirect>> {
    let kind = kind.parse::<EstablishmentKind>().into_flash(uri!("/establishments", directory))?;
    let establishments = conn
        .run(move |c| EstablishmentFinder::new(c, None).kind(kind).search_info())
        .await
        .into_flash(uri!("/establishments", directory))?;
    Ok(KindPage {
        inner: Msg::from_flash(flash),
        kind,
        establishments,
    })
}

#[derive(Template)]
#[template(path = "establishments/establishment.html")]
pub struct EstablishmentPage {
    inner: Msg,
    establishment: EstablishmentInfo,
    posts: Vec<PostInfo>,
    writable: bool,
}

#[get("/<kind>/<slug>")]
pub async fn establishment_page(
    kind: &str,
    slug: String,
    viewer: Option<ProfileInfoGuard<Cookie>>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EstablishmentPage, Flash<Redirect>> {
    let kind = kind.parse::<EstablishmentKind>().into_flash(uri!("/establishments", directory))?;
    let (establishment, posts) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let establishment = EstablishmentFinder::new(c, None)
                .kind(kind)
                .slug(&slug)
                .first_info()
                .map_err(|_| ArsenalDbError::EstablishmentNotFound)?;
            let association = Association::new(kind, establishment.get_id());
            let posts = PostFinder::new(c, None)
                .association(&association)
                .published(true)
                .search_info()?;
            Ok((establishment, posts))
        })
        .await
        .into_flash(uri!("/establishments", directory))?;

    let writable = viewer
        .map(|v| v.info.is_admin() || v.info.get_id() == establishment.get_owner_id())
        .unwrap_or(false);
    Ok(EstablishmentPage {
        inner: Msg::from_flash(flash),
        establishment,
        posts,
        writable,
    })
}

#[derive(Template)]
#[template(path = "establishments/form.html")]
pub struct EstablishmentFormPage {
    inner: Msg,
    establishment: Option<EstablishmentInfo>,
    kinds: Vec<Choice>,
}

#[get("/new")]
pub async fn new_establishment_page(
    _user: ProfileIdGuard<Cookie>,
    flash: Option<FlashMessage<'_>>,
) -> EstablishmentFormPage {
    EstablishmentFormPage {
        inner: Msg::from_flash(flash),
        establishment: None,
        kinds: Choice::list(EstablishmentKind::ALL, None, EstablishmentKind::as_str),
    }
}

#[get("/edit?<establishment_id>")]
pub async fn edit_establishment_page(
    _auth: Auth<EstablishmentWritable>,
    establishment_id: String,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EstablishmentFormPage, Flash<Redirect>> {
    let establishment = conn
        .run(move |c| EstablishmentId::find(c, &establishment_id)?.get_info(c))
        .await
        .into_flash(uri!("/establishments", directory))?;
    Ok(EstablishmentFormPage {
        inner: Msg::from_flash(flash),
        kinds: Choice::list(
            EstablishmentKind::ALL,
            Some(establishment.get_kind()),
            EstablishmentKind::as_str,
        ),
        establishment: Some(establishment),
    })
}
