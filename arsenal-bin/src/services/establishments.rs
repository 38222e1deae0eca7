use crate::{
    infras::{
        guards::*,
        storage::{Bucket, ObjectStorage, Storage},
        uploads::Upload,
    },
    pages::establishments::*,
    DbConn, IntoFlash,
};
use arsenal_db::establishments::{EstablishmentId, IncompleteEstablishment};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    State,
};

fn page_of(kind: &str, slug: &str) -> Redirect {
    Redirect::to(uri!("/establishments", establishment_page(kind, slug)))
}

#[post("/new", data = "<info>")]
pub async fn create_establishment(
    user: ProfileIdGuard<Cookie>,
    info: Form<IncompleteEstablishment>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let info = info.into_inner();
    let created = conn
        .run(move |c| info.create(c, &user.id)?.get_info(c))
        .await
        .into_flash(uri!("/establishments", new_establishment_page))?;
    Ok(page_of(created.get_kind().as_str(), created.get_slug()))
}

#[post("/edit?<establishment_id>", data = "<info>")]
pub async fn update_establishment(
    _auth: Auth<EstablishmentWritable>,
    establishment_id: String,
    info: Form<IncompleteEstablishment>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = uri!("/establishments", edit_establishment_page(establishment_id.as_str()));
    let info = info.into_inner();
    let updated = conn
        .run(move |c| EstablishmentId::find(c, &establishment_id)?.update(c, info))
        .await
        .into_flash(back)?;
    Ok(page_of(updated.get_kind().as_str(), updated.get_slug()))
}

#[derive(FromForm)]
pub struct ImageForm {
    pub image: Upload,
}

// Logos go to the bucket of the establishment's kind
#[post("/logo?<establishment_id>", data = "<form>")]
pub async fn upload_logo(
    _auth: Auth<EstablishmentWritable>,
    user: ProfileIdGuard<Cookie>,
    establishment_id: String,
    form: Form<ImageForm>,
    storage: &State<Storage>,
    conn: DbConn,
) -> Result<Redirect, Flash<Redirect>> {
    let back = uri!("/establishments", edit_establishment_page(establishment_id.as_str()));
    let image = form.into_inner().image.validate().into_flash(back.clone())?;
    let info = conn
        .run(move |c| EstablishmentId::find(c, &establishment_id)?.get_info(c))
        .await
        .into_flash(back.clone())?;
    let url = storage
        .put(
            Bucket::for_establishment(info.get_kind()),
            None,
            user.id.get_id(),
            image.object,
        )
        .await
        .into_flash(back.clone())?;
    let updated = conn
        .run(move |c| info.set_logo_url(url).update(c))
        .await
        .into_flash(back)?;
    Ok(page_of(updated.get_kind().as_str(), updated.get_slug()))
}

#[get("/delete?<establishment_id>")]
pub async fn delete_establishment(
    _auth: Auth<EstablishmentWritable>,
    establishment_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| EstablishmentId::find(c, &establishment_id)?.delete(c))
        .await
        .into_flash(uri!("/establishments", directory))?;
    Ok(Flash::success(
        Redirect::to(uri!("/user", crate::pages::users::portal)),
        "The establishment has been deleted",
    ))
}
