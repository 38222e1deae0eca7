use crate::{
    editor::{
        flow::{ImageFlow, LinkDialog},
        PendingImages,
    },
    infras::{
        basics::Msg,
        guards::*,
        storage::{Bucket, ObjectStorage, Storage},
        uploads::Upload,
    },
    pages::blog::*,
    sanitize_html, DbConn, IntoFlash,
};
use arsenal_db::{
    error::ArsenalDbError,
    posts::{Association, IncompletePost, PostId},
    profiles::ProfileInfo,
};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    State,
};

/// Every button of the editor posts the whole form
#[derive(FromForm)]
pub struct EditorForm {
    pub draft: Draft,
    #[field(default = String::new())]
    pub alt: String,
    pub position: Option<usize>,
    #[field(default = String::new())]
    pub url: String,
    #[field(default = false)]
    pub new_tab: bool,
    pub image: Option<Upload>,
}

impl EditorForm {
    fn into_parts(self) -> (Draft, Self) {
        let draft = self.draft.clone().normalized();
        (draft, self)
    }
}

fn render(draft: Draft, msg: Option<String>, prompt: Prompt) -> EditorPage {
    let inner = match msg {
        Some(m) => Msg::in_place(m),
        None => Msg::empty(),
    };
    EditorPage::new(draft, inner, prompt)
}

// Choosing a file validates it and opens the alt text prompt. Nothing is uploaded yet.
#[post("/editor/image", data = "<form>")]
pub async fn select_image(
    user: ProfileIdGuard<Cookie>,
    form: Form<EditorForm>,
    pending: &State<PendingImages>,
) -> EditorPage {
    let (draft, form) = form.into_inner().into_parts();
    let upload = match form.image {
        Some(upload) => upload,
        None => return render(draft, Some("Choose an image to upload".into()), Prompt::None),
    };
    match ImageFlow::new().select(upload) {
        Ok(flow) => {
            let suggested = flow.suggested_alt().to_string();
            pending.hold(user.id.get_id(), draft.key(), flow).await;
            render(draft, None, Prompt::NewImage(suggested))
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

#[post("/editor/image/confirm", data = "<form>")]
pub async fn confirm_image(
    user: ProfileIdGuard<Cookie>,
    form: Form<EditorForm>,
    pending: &State<PendingImages>,
    storage: &State<Storage>,
) -> EditorPage {
    let (mut draft, form) = form.into_inner().into_parts();
    let flow = match pending.take(user.id.get_id(), draft.key()).await {
        Some(flow) => flow,
        None => {
            return render(
                draft,
                Some("No image is waiting to be inserted".into()),
                Prompt::None,
            )
        }
    };
    let mut doc = draft.document();
    match flow
        .confirm(&mut doc, draft.cursor, &form.alt, storage.inner(), user.id.get_id())
        .await
    {
        Ok(_) => {
            draft.set_document(&doc);
            render(draft, None, Prompt::None)
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

#[post("/editor/image/cancel", data = "<form>")]
pub async fn cancel_image(
    user: ProfileIdGuard<Cookie>,
    form: Form<EditorForm>,
    pending: &State<PendingImages>,
) -> EditorPage {
    let (draft, _) = form.into_inner().into_parts();
    if let Some(flow) = pending.take(user.id.get_id(), draft.key()).await {
        flow.cancel();
    }
    render(draft, None, Prompt::None)
}

#[post("/editor/alt", data = "<form>")]
pub async fn edit_alt(_user: ProfileIdGuard<Cookie>, form: Form<EditorForm>) -> EditorPage {
    let (draft, form) = form.into_inner().into_parts();
    let position = form.position.unwrap_or(draft.cursor);
    match ImageFlow::new().edit_alt(&draft.document(), position) {
        Ok(flow) => {
            let prompt = Prompt::EditAlt(flow.position(), flow.current_alt().to_string());
            render(draft, None, prompt)
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

#[post("/editor/alt/confirm", data = "<form>")]
pub async fn confirm_alt(_user: ProfileIdGuard<Cookie>, form: Form<EditorForm>) -> EditorPage {
    let (mut draft, form) = form.into_inner().into_parts();
    let position = form.position.unwrap_or(draft.cursor);
    let mut doc = draft.document();
    let result = ImageFlow::new()
        .edit_alt(&doc, position)
        .and_then(|flow| flow.confirm(&mut doc, &form.alt));
    match result {
        Ok(_) => {
            draft.set_document(&doc);
            render(draft, None, Prompt::None)
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

// An empty selection never opens the dialog
#[post("/editor/link", data = "<form>")]
pub async fn open_link(_user: ProfileIdGuard<Cookie>, form: Form<EditorForm>) -> EditorPage {
    let (draft, _) = form.into_inner().into_parts();
    match LinkDialog::open(&draft.document(), draft.sel_start, draft.sel_end) {
        Ok(dialog) => {
            let prompt = Prompt::Link(dialog.selected_text().to_string());
            render(draft, None, prompt)
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

#[post("/editor/link/confirm", data = "<form>")]
pub async fn confirm_link(_user: ProfileIdGuard<Cookie>, form: Form<EditorForm>) -> EditorPage {
    let (mut draft, form) = form.into_inner().into_parts();
    let mut doc = draft.document();
    let result = LinkDialog::open(&doc, draft.sel_start, draft.sel_end)
        .and_then(|dialog| dialog.confirm(&mut doc, &form.url, form.new_tab));
    match result {
        Ok(()) => {
            draft.set_document(&doc);
            render(draft, None, Prompt::None)
        }
        // Keep the dialog open so the address can be fixed
        Err(e) => {
            let selected = doc.text_between(
                draft.sel_start.min(draft.sel_end),
                draft.sel_start.max(draft.sel_end),
            );
            let prompt = if selected.trim().is_empty() {
                Prompt::None
            } else {
                Prompt::Link(selected)
            };
            render(draft, Some(e.to_string()), prompt)
        }
    }
}

#[post("/editor/unlink", data = "<form>")]
pub async fn unlink(_user: ProfileIdGuard<Cookie>, form: Form<EditorForm>) -> EditorPage {
    let (mut draft, _) = form.into_inner().into_parts();
    let mut doc = draft.document();
    match LinkDialog::open(&doc, draft.sel_start, draft.sel_end) {
        Ok(dialog) => {
            dialog.unlink(&mut doc);
            draft.set_document(&doc);
            render(draft, None, Prompt::None)
        }
        Err(e) => render(draft, Some(e.to_string()), Prompt::None),
    }
}

// Make sure the user may write the post the draft belongs to
async fn writable_post(
    conn: &DbConn,
    user: &ProfileInfo,
    post_id: Option<String>,
) -> Result<Option<PostId>, ArsenalDbError> {
    let post_id = match post_id {
        Some(id) => id,
        None => return Ok(None),
    };
    let user = user.clone();
    conn.run(move |c| -> Result<Option<PostId>, ArsenalDbError> {
        let id = PostId::find(c, &post_id)?;
        if id.writable_by(c, &user)? {
            Ok(Some(id))
        } else {
            Err(ArsenalDbError::NotPermitted)
        }
    })
    .await
}

// The featured image is saved right away on existing posts
#[post("/editor/featured", data = "<form>")]
pub async fn featured_image(
    user: ProfileInfoGuard<Cookie>,
    form: Form<EditorForm>,
    storage: &State<Storage>,
    conn: DbConn,
) -> EditorPage {
    let (mut draft, form) = form.into_inner().into_parts();
    let image = match form.image.ok_or(()).map(Upload::validate) {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => return render(draft, Some(e.to_string()), Prompt::None),
        Err(()) => return render(draft, Some("Choose an image to upload".into()), Prompt::None),
    };
    let post = match writable_post(&conn, &user.info, draft.post_id.clone()).await {
        Ok(post) => post,
        Err(e) => return render(draft, Some(e.to_string()), Prompt::None),
    };
    let url = match storage
        .put(Bucket::Blog, Some("featured"), user.info.get_id(), image.object)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            log::error!("Failed to upload a featured image: {}", e);
            return render(draft, Some(format!("Image upload failed: {}", e)), Prompt::None);
        }
    };
    if let Some(post) = post {
        let saved = url.clone();
        if let Err(e) = conn
            .run(move |c| post.set_featured_image(c, Some(saved.as_str())))
            .await
        {
            return render(draft, Some(e.to_string()), Prompt::None);
        }
    }
    draft.featured_image = Some(url);
    render(draft, None, Prompt::None)
}

// Validation failures are shown in place so nothing typed is lost
#[post("/editor/submit", data = "<form>")]
pub async fn submit(
    user: ProfileInfoGuard<Cookie>,
    form: Form<EditorForm>,
    pending: &State<PendingImages>,
    conn: DbConn,
) -> Result<Redirect, EditorPage> {
    let (draft, _) = form.into_inner().into_parts();
    // An image left waiting for its alt text is not part of the post
    pending.take(user.info.get_id(), draft.key()).await;
    let doc = draft.document();
    if draft.title.trim().is_empty() {
        return Err(render(draft, Some("Title is required".into()), Prompt::None));
    }
    if doc.is_empty() {
        return Err(render(draft, Some("Content is required".into()), Prompt::None));
    }

    let mut post = IncompletePost::new(&draft.title, sanitize_html(&doc.to_html()), draft.category)
        .published(draft.published);
    if let Some(url) = &draft.featured_image {
        post = post.featured_image(url);
    }

    let existing = match writable_post(&conn, &user.info, draft.post_id.clone()).await {
        Ok(existing) => existing,
        Err(e) => return Err(render(draft, Some(e.to_string()), Prompt::None)),
    };
    let requested = draft.establishment_kind.zip(draft.establishment_id.clone());
    let author = user.info;
    let result = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            match existing {
                // The association is re-read and kept inside the update
                Some(id) => id.update(c, post),
                None => {
                    let association = Association::resolve(
                        c,
                        &author,
                        requested.as_ref().map(|(k, id)| (*k, id.as_str())),
                    )?;
                    post.create(c, &author.to_id(), association.as_ref())?
                        .get_info(c)
                }
            }
        })
        .await;

    match result {
        Ok(info) => Ok(Redirect::to(uri!(
            "/blog",
            crate::pages::blog::post_page(info.get_slug())
        ))),
        Err(e) => Err(render(draft, Some(e.to_string()), Prompt::None)),
    }
}

#[get("/delete?<post_id>")]
pub async fn delete_post(
    _auth: Auth<PostWritable>,
    post_id: String,
    conn: DbConn,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    conn.run(move |c| PostId::find(c, &post_id)?.delete(c))
        .await
        .into_flash(uri!("/user", crate::pages::users::portal))?;
    Ok(Flash::success(
        Redirect::to(uri!("/user", crate::pages::users::portal)),
        "The post has been deleted",
    ))
}
