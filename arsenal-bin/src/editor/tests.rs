use super::{
    document::{Block, Document, Inline, Link, Marks},
    flow::{normalize_url, EditorError, ImageFlow, LinkDialog},
    PendingImages, PENDING_TIMEOUT,
};
use crate::infras::{
    storage::{Bucket, MemoryStorage, ObjectStorage, StoredObject},
    uploads::{Upload, UploadRejection, MAX_IMAGE_BYTES},
};
use bytes::Bytes;
use rocket::http::ContentType;
use std::time::{Duration, Instant};

struct BrokenStorage;

#[rocket::async_trait]
impl ObjectStorage for BrokenStorage {
    async fn upload(&self, _: Bucket, _: &str, _: StoredObject) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("http://nowhere/{}/{}", bucket, key)
    }
}

fn png(len: usize, stem: &str) -> Upload {
    Upload {
        bytes: Bytes::from(vec![7u8; len]),
        content_type: ContentType::PNG,
        file_stem: Some(stem.to_string()),
        truncated: false,
    }
}

fn link(href: &str) -> Link {
    Link {
        href: href.to_string(),
        new_tab: false,
    }
}

#[test]
fn parse_paragraphs_links_and_images() {
    let doc = Document::from_html(
        "<p>Hello <a href=\"https://a.org\" target=\"_blank\">world</a></p>\n<p><img src=\"x.png\" alt=\"X\">done</p>",
    );
    assert_eq!(
        doc.nodes(),
        &[
            Inline::text("Hello "),
            Inline::Text {
                text: "world".into(),
                link: Some(Link {
                    href: "https://a.org".into(),
                    new_tab: true
                }),
                marks: Marks::default(),
            },
            Inline::Break,
            Inline::Image {
                src: "x.png".into(),
                alt: "X".into()
            },
            Inline::text("done"),
        ]
    );
    assert_eq!(doc.len(), 6 + 5 + 1 + 1 + 4);
    assert_eq!(doc.image_at(12), Some(("x.png", "X")));
    assert_eq!(doc.image_at(11), None);
}

#[test]
fn render_is_stable() {
    let html = "<p>a &amp; b</p><p><a href=\"/x\" target=\"_blank\" rel=\"noopener noreferrer\">x</a><img src=\"i.png\" alt=\"&quot;q&quot;\"></p>";
    let doc = Document::from_html(html);
    assert_eq!(doc.to_html(), html);
    assert_eq!(Document::from_html(&doc.to_html()), doc);
}

#[test]
fn scripts_are_dropped() {
    let doc = Document::from_html("<p>ok<script>alert(1)</script></p>");
    assert_eq!(doc.to_html(), "<p>ok</p>");
}

#[test]
fn emptiness() {
    assert!(Document::from_html("").is_empty());
    assert!(Document::from_html("<p> </p><p><br></p>").is_empty());
    assert!(!Document::from_html("<p><img src=\"a.png\"></p>").is_empty());
}

#[test]
fn insert_image_splits_text() {
    let mut doc = Document::new(vec![Inline::text("abcd")]);
    doc.insert_image(2, "i.png", "I");
    assert_eq!(doc.to_html(), "<p>ab<img src=\"i.png\" alt=\"I\">cd</p>");

    // Past the end appends
    doc.insert_image(100, "j.png", "J");
    assert_eq!(doc.image_at(5), Some(("j.png", "J")));
}

#[test]
fn links_merge_and_unlink() {
    let mut doc = Document::new(vec![Inline::text("one two three")]);
    doc.apply_link(4, 7, link("https://two.org"));
    assert_eq!(
        doc.to_html(),
        "<p>one <a href=\"https://two.org\">two</a> three</p>"
    );
    doc.apply_link(0, 3, link("https://two.org"));
    doc.apply_link(3, 4, link("https://two.org"));
    assert_eq!(doc.nodes().len(), 2);

    doc.remove_link(0, doc.len());
    assert_eq!(doc.nodes(), &[Inline::text("one two three")]);
}

#[test]
fn outline_positions() {
    let doc = Document::from_html("<p>ab</p><p><img src=\"a.png\" alt=\"A\"></p>");
    let outline = doc.outline();
    let positions: Vec<usize> = outline.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0, 2, 3]);
    assert_eq!(outline[2].label, "[image: A]");
}

#[rocket::async_test]
async fn confirmed_image_is_uploaded_and_inserted() {
    let storage = MemoryStorage::new("http://cdn.test");
    let mut doc = Document::new(vec![Inline::text("intro")]);

    let flow = ImageFlow::new().select(png(2 * 1024 * 1024, "photo")).unwrap();
    assert_eq!(flow.suggested_alt(), "photo");
    assert_eq!(storage.len().await, 0);

    let (_, url) = flow
        .confirm(&mut doc, 5, "Front view", &storage, "u1")
        .await
        .unwrap();
    assert!(url.starts_with("http://cdn.test/blog/u1-"));
    assert_eq!(doc.image_at(5), Some((url.as_str(), "Front view")));
    assert_eq!(storage.len().await, 1);
}

#[rocket::async_test]
async fn blank_alt_falls_back_to_file_name() {
    let storage = MemoryStorage::new("http://cdn.test");
    let mut doc = Document::default();
    let flow = ImageFlow::new().select(png(10, "range-day")).unwrap();
    flow.confirm(&mut doc, 0, "  ", &storage, "u1").await.unwrap();
    assert_eq!(doc.image_at(0).map(|(_, alt)| alt), Some("range-day"));
}

#[rocket::async_test]
async fn failed_upload_leaves_document_alone() {
    let mut doc = Document::new(vec![Inline::text("intro")]);
    let before = doc.clone();
    let flow = ImageFlow::new().select(png(10, "photo")).unwrap();
    let err = flow
        .confirm(&mut doc, 0, "alt", &BrokenStorage, "u1")
        .await
        .err();
    assert!(matches!(err, Some(EditorError::Storage(_))));
    assert_eq!(doc, before);
}

#[test]
fn rejected_files_never_prompt() {
    let err = ImageFlow::new()
        .select(png(MAX_IMAGE_BYTES + 1, "big"))
        .err();
    assert_eq!(err, Some(EditorError::Rejected(UploadRejection::TooLarge)));

    let gif = Upload {
        content_type: ContentType::GIF,
        ..png(10, "anim")
    };
    assert_eq!(
        ImageFlow::new().select(gif).err(),
        Some(EditorError::Rejected(UploadRejection::UnsupportedType))
    );
}

#[test]
fn edit_alt_of_existing_image() {
    let mut doc = Document::from_html("<p>a<img src=\"a.png\" alt=\"old\"></p>");
    let flow = ImageFlow::new().edit_alt(&doc, 1).unwrap();
    assert_eq!(flow.current_alt(), "old");
    flow.confirm(&mut doc, "new").unwrap();
    assert_eq!(doc.image_at(1), Some(("a.png", "new")));

    assert_eq!(
        ImageFlow::new().edit_alt(&doc, 0).err(),
        Some(EditorError::NoImageAt(0))
    );
}

#[test]
fn link_dialog() {
    let mut doc = Document::new(vec![Inline::text("see the docs")]);
    assert_eq!(
        LinkDialog::open(&doc, 3, 3).err(),
        Some(EditorError::EmptySelection)
    );

    let dialog = LinkDialog::open(&doc, 12, 8).unwrap();
    assert_eq!(dialog.selected_text(), "docs");
    assert_eq!(
        LinkDialog::open(&doc, 8, 12)
            .unwrap()
            .confirm(&mut doc, " ", false)
            .err(),
        Some(EditorError::EmptyUrl)
    );
    dialog.confirm(&mut doc, "docs.example.org", true).unwrap();
    assert!(doc
        .to_html()
        .contains("<a href=\"https://docs.example.org\" target=\"_blank\""));

    LinkDialog::open(&doc, 0, doc.len()).unwrap().unlink(&mut doc);
    assert_eq!(doc.to_html(), "<p>see the docs</p>");
}

#[test]
fn url_normalization() {
    assert_eq!(normalize_url("example.org").as_deref(), Some("https://example.org"));
    assert_eq!(normalize_url("http://a.b").as_deref(), Some("http://a.b"));
    assert_eq!(normalize_url("/blog/x").as_deref(), Some("/blog/x"));
    assert_eq!(normalize_url("   "), None);
}

#[rocket::async_test]
async fn pending_images_are_per_user_and_draft() {
    let pending = PendingImages::default();
    pending
        .hold("u1", "d1", ImageFlow::new().select(png(10, "one")).unwrap())
        .await;
    pending
        .hold("u1", "d1", ImageFlow::new().select(png(10, "two")).unwrap())
        .await;
    pending
        .hold("u1", "d2", ImageFlow::new().select(png(10, "other")).unwrap())
        .await;
    assert_eq!(pending.len().await, 2);

    assert!(pending.take("u2", "d1").await.is_none());
    let flow = pending.take("u1", "d1").await.unwrap();
    assert_eq!(flow.suggested_alt(), "two");
    assert!(pending.take("u1", "d1").await.is_none());
    assert_eq!(
        pending.take("u1", "d2").await.map(|f| f.suggested_alt().to_string()),
        Some("other".to_string())
    );
}

#[rocket::async_test]
async fn abandoned_images_are_dropped() {
    let pending = PendingImages::default();
    let start = Instant::now();
    pending
        .hold_at("u1", "old", ImageFlow::new().select(png(10, "a")).unwrap(), start)
        .await;
    pending
        .hold_at(
            "u2",
            "new",
            ImageFlow::new().select(png(10, "b")).unwrap(),
            start + PENDING_TIMEOUT + Duration::from_secs(1),
        )
        .await;
    assert_eq!(pending.len().await, 1);
    assert!(pending.take("u1", "old").await.is_none());
    assert!(pending.take("u2", "new").await.is_some());
}

#[test]
fn formatting_survives_a_round_trip() {
    let html = "<h2>Intro</h2><ul><li>one</li><li>two</li></ul><p><strong>bold</strong> and <em>it</em></p>";
    let doc = Document::from_html(html);
    assert_eq!(doc.to_html(), html);
    assert_eq!(doc.block(0), Block::Heading(2));
    assert_eq!(doc.block(1), Block::Bullet);
    assert_eq!(doc.block(3), Block::Paragraph);
    assert_eq!(doc.len(), 5 + 1 + 3 + 1 + 3 + 1 + 4 + 5 + 2);

    let html = "<ol><li>first</li></ol><blockquote>quoted</blockquote><pre>let x = 1;</pre><p><a href=\"/x\"><s><code>old</code></s></a><u>under</u></p>";
    assert_eq!(Document::from_html(html).to_html(), html);
}

#[test]
fn edits_keep_formatting() {
    let mut doc = Document::from_html("<h3>Range day</h3><p><strong>bold words</strong></p>");
    // "Range day" + break, then the cursor sits inside "bold words"
    doc.insert_image(14, "i.png", "I");
    doc.apply_link(10, 14, link("https://b.org"));
    assert_eq!(
        doc.to_html(),
        "<h3>Range day</h3><p><a href=\"https://b.org\"><strong>bold</strong></a><img src=\"i.png\" alt=\"I\"><strong> words</strong></p>"
    );

    doc.remove_link(0, doc.len());
    assert_eq!(
        doc.to_html(),
        "<h3>Range day</h3><p><strong>bold</strong><img src=\"i.png\" alt=\"I\"><strong> words</strong></p>"
    );
}

#[test]
fn line_breaks_stay_in_their_block() {
    let doc = Document::from_html("<h1>a<br>b</h1><p>c</p>");
    assert_eq!(doc.to_html(), "<h1>a</h1><h1>b</h1><p>c</p>");
    assert_eq!(doc.outline()[1].label, "[new heading]");
    assert_eq!(doc.outline()[3].label, "[new paragraph]");
}
