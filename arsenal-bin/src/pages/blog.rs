use crate::{
    editor::document::{Document, OutlineEntry},
    infras::{
        basics::{Choice, Msg},
        guards::*,
    },
    sanitize_html, DbConn, IntoFlash,
};
use arsenal_db::{
    enums::{EstablishmentKind, PostCategory},
    error::ArsenalDbError,
    establishments::{EstablishmentId, EstablishmentInfo},
    posts::{PostFinder, PostId, PostInfo},
};
use askama::Template;
use rand::{distributions::Alphanumeric, prelude::StdRng, Rng, SeedableRng};
use rocket::{
    request::FlashMessage,
    response::{Flash, Redirect},
};

#[derive(Template)]
#[template(path = "blog/home.html")]
pub struct BlogHomePage {
    inner: Msg,
    posts: Vec<PostInfo>,
    category: Option<PostCategory>,
    categories: Vec<Choice>,
}

#[get("/?<category>")]
pub async fn home_page(
    category: Option<PostCategory>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<BlogHomePage, Flash<Redirect>> {
    let posts = conn
        .run(move |c| {
            let mut finder = PostFinder::new(c, None).published(true);
            if let Some(category) = category {
                finder = finder.category(category);
            }
            finder.search_info()
        })
        .await
        .into_flash(uri!("/"))?;
    Ok(BlogHomePage {
        inner: Msg::from_flash(flash),
        posts,
        category,
        categories: Choice::list(PostCategory::ALL, category, PostCategory::as_str),
    })
}

#[derive(Template)]
#[template(path = "blog/post.html")]
pub struct PostPage {
    inner: Msg,
    post: PostInfo,
    establishment: Option<EstablishmentInfo>,
    writable: bool,
}

// Drafts are only visible to those who may edit them, and only published posts count views
#[get("/<slug>")]
pub async fn post_page(
    slug: String,
    viewer: Option<ProfileInfoGuard<Cookie>>,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<PostPage, Flash<Redirect>> {
    let (post, establishment, writable) = conn
        .run(move |c| -> Result<_, ArsenalDbError> {
            let id = PostFinder::new(c, None)
                .slug(&slug)
                .first()
                .map_err(|_| ArsenalDbError::PostNotFound)?;
            let writable = match &viewer {
                Some(v) => id.writable_by(c, &v.info)?,
                None => false,
            };
            let mut post = id.get_info(c)?;
            if !post.is_published() && !writable {
                return Err(ArsenalDbError::PostNotFound);
            }
            if post.is_published() {
                id.increment_views(c)?;
                post = id.get_info(c)?;
            }
            let establishment = match post.get_association()? {
                Some(a) => Some(EstablishmentId::find(c, a.establishment_id())?.get_info(c)?),
                None => None,
            };
            Ok((post, establishment, writable))
        })
        .await
        .into_flash(uri!("/blog", home_page(_)))?;

    Ok(PostPage {
        inner: Msg::from_flash(flash),
        post,
        establishment,
        writable,
    })
}

/// The editor state carried by every editor form post
#[derive(Debug, Clone, FromForm)]
pub struct Draft {
    pub post_id: Option<String>,
    // Tells apart the editors a user has open
    #[field(default = String::new())]
    pub token: String,
    #[field(default = String::new())]
    pub title: String,
    #[field(default = PostCategory::News)]
    pub category: PostCategory,
    #[field(default = String::new())]
    pub content: String,
    pub featured_image: Option<String>,
    #[field(default = false)]
    pub published: bool,
    pub establishment_kind: Option<EstablishmentKind>,
    pub establishment_id: Option<String>,
    #[field(default = 0)]
    pub cursor: usize,
    #[field(default = 0)]
    pub sel_start: usize,
    #[field(default = 0)]
    pub sel_end: usize,
}

// Browsers send empty strings for untouched optional inputs
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn draft_token() -> String {
    StdRng::from_entropy()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

impl Draft {
    pub fn new(
        establishment_kind: Option<EstablishmentKind>,
        establishment_id: Option<String>,
    ) -> Self {
        Self {
            post_id: None,
            token: draft_token(),
            title: String::new(),
            category: PostCategory::default(),
            content: String::new(),
            featured_image: None,
            published: false,
            establishment_kind,
            establishment_id,
            cursor: 0,
            sel_start: 0,
            sel_end: 0,
        }
    }

    pub fn from_post(post: &PostInfo) -> Self {
        let content = Document::from_html(post.get_content());
        Self {
            post_id: Some(post.get_id().to_string()),
            token: draft_token(),
            title: post.get_title().to_string(),
            category: post.get_category(),
            cursor: content.len(),
            content: content.to_html(),
            featured_image: post.get_featured_image().map(String::from),
            published: post.is_published(),
            establishment_kind: None,
            establishment_id: None,
            sel_start: 0,
            sel_end: 0,
        }
    }

    pub fn normalized(self) -> Self {
        let token = match self.token.trim() {
            "" => draft_token(),
            token => token.to_string(),
        };
        Self {
            post_id: non_blank(self.post_id),
            token,
            featured_image: non_blank(self.featured_image),
            establishment_id: non_blank(self.establishment_id),
            ..self
        }
    }

    /// What pending editor state of this draft is filed under
    pub fn key(&self) -> &str {
        self.post_id.as_deref().unwrap_or(&self.token)
    }

    pub fn document(&self) -> Document {
        Document::from_html(&sanitize_html(&self.content))
    }

    /// Write the document back, keeping the cursor inside it
    pub fn set_document(&mut self, doc: &Document) {
        self.content = doc.to_html();
        self.cursor = self.cursor.min(doc.len());
    }
}

/// The dialog open above the editor
pub enum Prompt {
    None,
    // Suggested alt text of the pending image
    NewImage(String),
    // Position and current alt text of an image in the document
    EditAlt(usize, String),
    // The selected text
    Link(String),
}

#[derive(Template)]
#[template(path = "blog/editor.html")]
pub struct EditorPage {
    inner: Msg,
    draft: Draft,
    preview: String,
    outline: Vec<OutlineEntry>,
    prompt: Prompt,
    categories: Vec<Choice>,
}

impl EditorPage {
    pub fn new(draft: Draft, inner: Msg, prompt: Prompt) -> Self {
        let doc = draft.document();
        Self {
            inner,
            preview: sanitize_html(&doc.to_html()),
            outline: doc.outline(),
            categories: Choice::list(PostCategory::ALL, Some(draft.category), PostCategory::as_str),
            draft,
            prompt,
        }
    }
}

// A new post, optionally on behalf of one of the user's establishments
#[get("/editor/new?<establishment_kind>&<establishment_id>")]
pub async fn new_post_page(
    _user: ProfileIdGuard<Cookie>,
    establishment_kind: Option<EstablishmentKind>,
    establishment_id: Option<String>,
    flash: Option<FlashMessage<'_>>,
) -> EditorPage {
    EditorPage::new(
        Draft::new(establishment_kind, non_blank(establishment_id)),
        Msg::from_flash(flash),
        Prompt::None,
    )
}

#[get("/editor?<post_id>")]
pub async fn edit_post_page(
    _auth: Auth<PostWritable>,
    post_id: String,
    flash: Option<FlashMessage<'_>>,
    conn: DbConn,
) -> Result<EditorPage, Flash<Redirect>> {
    let post = conn
        .run(move |c| PostId::find(c, &post_id)?.get_info(c))
        .await
        .into_flash(uri!("/blog", home_page(_)))?;
    Ok(EditorPage::new(
        Draft::from_post(&post),
        Msg::from_flash(flash),
        Prompt::None,
    ))
}
