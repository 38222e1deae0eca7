use crate::{build, infras::storage::Storage, DbConn};
use arsenal_db::{
    enums::EstablishmentKind,
    establishments::EstablishmentFinder,
    posts::{Association, PostFinder},
    profiles::ProfileId,
};
use rocket::{
    data::{Limits, ToByteUnit},
    figment::Figment,
    http::{ContentType, RawStr, Status},
    local::asynchronous::{Client, LocalResponse},
};
use serde_json::{json, Value};
use tempfile::TempDir;

const BOUNDARY: &str = "X-ARSENAL-BOUNDARY";
const PASSWORD: &str = "strongpasswd";

// The directory holds the database file and must outlive the client
struct TestApp {
    client: Client,
    _dir: TempDir,
}

async fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("arsenal.sqlite");
    let figment = Figment::from(rocket::Config::debug_default())
        .merge(("databases.arsenal.url", db.to_str().unwrap()))
        .merge(("session.ttl_secs", 3600))
        .merge(("credits.event_cost", 1))
        .merge(("credits.signup_grant", 0))
        .merge(("bootstrap.admins", vec!["admin@example.org"]))
        .merge(("storage.backend", "memory"))
        .merge(("storage.public_base", "http://cdn.test"))
        .merge((
            "limits",
            Limits::default()
                .limit("data-form", 12.mebibytes())
                .limit("file", 6.mebibytes()),
        ));
    let client = Client::tracked(build(figment)).await.unwrap();
    TestApp { client, _dir: dir }
}

fn urlencoded(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, RawStr::new(v).percent_encode()))
        .collect::<Vec<_>>()
        .join("&")
}

// A multipart body with text fields and at most one file named `image`
fn multipart(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_type() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

fn location(response: &LocalResponse<'_>) -> String {
    response.headers().get_one("Location").unwrap_or_default().to_string()
}

async fn register(client: &Client, email: &str) {
    let response = client
        .post("/user/register")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("email", email),
            ("username", email.split('@').next().unwrap()),
            ("password", PASSWORD),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/user");
}

async fn login<'c>(client: &'c Client, email: &str) -> LocalResponse<'c> {
    client
        .post("/user/login")
        .header(ContentType::Form)
        .body(urlencoded(&[("email", email), ("password", PASSWORD)]))
        .dispatch()
        .await
}

async fn logout(client: &Client) {
    client.get("/user/logout").dispatch().await;
}

async fn profile_id(client: &Client, email: &'static str) -> ProfileId {
    let conn = DbConn::get_one(client.rocket()).await.unwrap();
    conn.run(move |c| ProfileId::find_by_email(c, email)).await.unwrap()
}

async fn stored_objects(client: &Client) -> usize {
    match client.rocket().state::<Storage>().unwrap() {
        Storage::Memory(m) => m.len().await,
        Storage::S3(_) => panic!("tests run against the memory backend"),
    }
}

#[rocket::async_test]
async fn admin_disables_user_through_api() {
    let app = app().await;
    let client = &app.client;
    register(client, "bob@example.org").await;
    logout(client).await;
    register(client, "admin@example.org").await;

    let users: Value = client
        .get("/api/admin/users")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    let bob = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "bob@example.org")
        .unwrap();
    assert!(bob.get("hashed_passwd").is_none());
    let bob_id = bob["id"].as_str().unwrap().to_string();

    let response = client
        .patch(format!("/api/users/{}/disable", bob_id))
        .header(ContentType::JSON)
        .body(json!({ "disabled": true }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Value = response.into_json().await.unwrap();
    assert_eq!(updated["is_disabled"], true);
    assert_eq!(updated["email"], "bob@example.org");

    // Admins cannot lock themselves out
    let me = profile_id(client, "admin@example.org").await;
    let response = client
        .patch(format!("/api/users/{}/disable", me.get_id()))
        .header(ContentType::JSON)
        .body(json!({ "disabled": true }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    logout(client).await;
    let response = login(client, "bob@example.org").await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/user/login");
}

#[rocket::async_test]
async fn api_errors_are_json() {
    let app = app().await;
    let client = &app.client;

    let response = client.get("/api/admin/users").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["error"].is_string());

    register(client, "carol@example.org").await;
    let response = client.get("/api/admin/users").dispatch().await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client.get("/api/wishlist/check/nothing").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "listing doesn't exist");
}

#[rocket::async_test]
async fn disabled_session_is_sent_to_login() {
    let app = app().await;
    let client = &app.client;
    register(client, "dave@example.org").await;
    assert_eq!(client.get("/user").dispatch().await.status(), Status::Ok);

    let id = profile_id(client, "dave@example.org").await;
    let conn = DbConn::get_one(client.rocket()).await.unwrap();
    conn.run(move |c| id.get_info(c).unwrap().set_disabled(true).update(c))
        .await
        .unwrap();

    let response = client.get("/user").dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/user/login");
}

#[rocket::async_test]
async fn image_is_uploaded_on_confirm_only() {
    let app = app().await;
    let client = &app.client;
    register(client, "erin@example.org").await;

    let draft = [
        ("draft.token", "range-day"),
        ("draft.title", "Range day"),
        ("draft.content", "<p>We went shooting.</p>"),
        ("draft.cursor", "1"),
    ];
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let response = client
        .post("/blog/editor/image")
        .header(multipart_type())
        .body(multipart(&draft, Some(("photo.png", "image/png", png))))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains(r#"name="alt" value="photo""#));
    assert_eq!(stored_objects(client).await, 0);

    let mut confirm = draft.to_vec();
    confirm.push(("alt", "Front view"));
    let response = client
        .post("/blog/editor/image/confirm")
        .header(multipart_type())
        .body(multipart(&confirm, None))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains(r#"alt="Front view""#));
    assert!(body.contains("http://cdn.test/blog/"));
    assert_eq!(stored_objects(client).await, 1);
}

#[rocket::async_test]
async fn pending_image_belongs_to_its_draft() {
    let app = app().await;
    let client = &app.client;
    register(client, "erin@example.org").await;

    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let select = |token: &'static str| {
        client
            .post("/blog/editor/image")
            .header(multipart_type())
            .body(multipart(
                &[("draft.token", token), ("draft.title", "Two tabs")],
                Some(("photo.png", "image/png", png)),
            ))
            .dispatch()
    };
    let confirm = |token: &'static str| {
        client
            .post("/blog/editor/image/confirm")
            .header(multipart_type())
            .body(multipart(
                &[("draft.token", token), ("draft.title", "Two tabs"), ("alt", "x")],
                None,
            ))
            .dispatch()
    };
    let waiting = "No image is waiting to be inserted";

    assert_eq!(select("tab-a").await.status(), Status::Ok);
    let body = confirm("tab-b").await.into_string().await.unwrap();
    assert!(body.contains(waiting));
    let body = confirm("tab-a").await.into_string().await.unwrap();
    assert!(!body.contains(waiting));
    assert_eq!(stored_objects(client).await, 1);

    // Submitting the draft drops the image still waiting for its alt text
    assert_eq!(select("tab-c").await.status(), Status::Ok);
    let response = client
        .post("/blog/editor/submit")
        .header(multipart_type())
        .body(multipart(
            &[
                ("draft.token", "tab-c"),
                ("draft.title", "Two tabs"),
                ("draft.content", "<p>Done</p>"),
            ],
            None,
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    let body = confirm("tab-c").await.into_string().await.unwrap();
    assert!(body.contains(waiting));
    assert_eq!(stored_objects(client).await, 1);
}

#[rocket::async_test]
async fn oversized_image_is_rejected() {
    let app = app().await;
    let client = &app.client;
    register(client, "frank@example.org").await;

    let big = vec![0u8; crate::infras::uploads::MAX_IMAGE_BYTES + 1];
    let response = client
        .post("/blog/editor/image")
        .header(multipart_type())
        .body(multipart(
            &[("draft.title", "Too big"), ("draft.content", "")],
            Some(("huge.png", "image/png", &big)),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains("Image must be 5MB or smaller"));
    assert!(!body.contains(r#"name="alt""#));
    assert_eq!(stored_objects(client).await, 0);
}

#[rocket::async_test]
async fn editing_a_post_keeps_its_store() {
    let app = app().await;
    let client = &app.client;
    register(client, "gina@example.org").await;

    let response = client
        .post("/establishments/new")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("kind", "store"),
            ("business_name", "Iron Works"),
            ("location", "Austin, TX"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/establishments/store/iron-works");

    let conn = DbConn::get_one(client.rocket()).await.unwrap();
    let store_id = conn
        .run(|c| EstablishmentFinder::new(c, None).slug("iron-works").first())
        .await
        .unwrap()
        .get_id()
        .to_string();

    let response = client
        .post("/blog/editor/submit")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("draft.title", "Spring sale"),
            ("draft.content", "<p>Everything 10% off</p>"),
            ("draft.published", "true"),
            ("draft.establishment_kind", "store"),
            ("draft.establishment_id", store_id.as_str()),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/blog/spring-sale");

    let post_id = conn
        .run(|c| PostFinder::new(c, None).slug("spring-sale").first())
        .await
        .unwrap()
        .get_id()
        .to_string();

    // The edit form carries no association fields at all
    let response = client
        .post("/blog/editor/submit")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("draft.post_id", post_id.as_str()),
            ("draft.title", "Summer sale"),
            ("draft.content", "<p>Everything 20% off</p>"),
            ("draft.published", "true"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/blog/summer-sale");

    let post = conn
        .run(|c| PostFinder::new(c, None).slug("summer-sale").first_info())
        .await
        .unwrap();
    assert_eq!(post.get_id(), post_id);
    assert_eq!(
        post.get_association().unwrap(),
        Some(Association::new(EstablishmentKind::Store, &store_id))
    );

    let page = client.get("/establishments/store/iron-works").dispatch().await;
    assert!(page.into_string().await.unwrap().contains("Summer sale"));
}

#[rocket::async_test]
async fn editing_a_post_keeps_its_formatting() {
    let app = app().await;
    let client = &app.client;
    register(client, "gail@example.org").await;

    let content = "<h2>Intro</h2><ul><li>one</li><li>two</li></ul><p><strong>bold</strong> and <em>it</em></p>";
    let response = client
        .post("/blog/editor/submit")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("draft.title", "Formatted"),
            ("draft.content", content),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);

    let conn = DbConn::get_one(client.rocket()).await.unwrap();
    let post = conn
        .run(|c| PostFinder::new(c, None).slug("formatted").first_info())
        .await
        .unwrap();
    assert_eq!(post.get_content(), content);
    let post_id = post.get_id().to_string();

    let edited = format!("{}<p>More</p>", content);
    let response = client
        .post("/blog/editor/submit")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("draft.post_id", post_id.as_str()),
            ("draft.title", "Formatted"),
            ("draft.content", edited.as_str()),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);

    let post = conn
        .run(|c| PostFinder::new(c, None).slug("formatted").first_info())
        .await
        .unwrap();
    assert_eq!(post.get_content(), edited);
}

#[rocket::async_test]
async fn empty_post_is_refused_in_place() {
    let app = app().await;
    let client = &app.client;
    register(client, "hank@example.org").await;

    let response = client
        .post("/blog/editor/submit")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("draft.title", "Nothing to say"),
            ("draft.content", "<p> </p><br>"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains("Content is required"));
    assert!(body.contains(r#"value="Nothing to say""#));
}

#[rocket::async_test]
async fn admin_filters_establishments_by_kind() {
    let app = app().await;
    let client = &app.client;
    register(client, "owner@example.org").await;
    logout(client).await;
    register(client, "admin@example.org").await;

    for (kind, name) in [
        ("store", "Iron Works"),
        ("store", "Brass & Steel"),
        ("store", "Lone Star Outfitters"),
        ("club", "Hill Country Rifle Club"),
    ] {
        let response = client
            .post("/api/admin/establishments")
            .header(ContentType::JSON)
            .body(
                json!({
                    "owner_email": "owner@example.org",
                    "kind": kind,
                    "business_name": name,
                    "location": "Austin, TX",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
    }

    let stores: Value = client
        .get("/api/admin/establishments?kind=store")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(stores.as_array().unwrap().len(), 3);

    let response = client.get("/admin/establishments?kind=store").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert_eq!(
        body.matches("/admin/establishments/delete?establishment_id=").count(),
        3
    );
    assert!(!body.contains("Hill Country Rifle Club"));

    let response = client
        .post("/admin/establishments/new")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("owner_email", "owner@example.org"),
            ("establishment.kind", "club"),
            ("establishment.business_name", "Cedar Park Pistol League"),
            ("establishment.location", "Cedar Park, TX"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/establishments?kind=club");
    let clubs: Value = client
        .get("/api/admin/establishments?kind=club")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(clubs.as_array().unwrap().len(), 2);
}

#[rocket::async_test]
async fn event_creation_needs_credits() {
    let app = app().await;
    let client = &app.client;
    register(client, "ivan@example.org").await;

    let event = urlencoded(&[
        ("title", "Steel challenge"),
        ("location", "Hill Country Range"),
        ("start_date", "2026-11-07"),
        ("end_date", "2026-11-08"),
    ]);
    let response = client
        .post("/events/new")
        .header(ContentType::Form)
        .body(event.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/events/new");

    logout(client).await;
    register(client, "admin@example.org").await;
    let ivan = profile_id(client, "ivan@example.org").await;
    let response = client
        .post(format!("/api/users/{}/credits", ivan.get_id()))
        .header(ContentType::JSON)
        .body(json!({ "amount": 2, "reason": "welcome" }).to_string())
        .dispatch()
        .await;
    let balance: Value = response.into_json().await.unwrap();
    assert_eq!(balance["balance"], 2);

    logout(client).await;
    assert_eq!(login(client, "ivan@example.org").await.status(), Status::SeeOther);
    let response = client
        .post("/events/new")
        .header(ContentType::Form)
        .body(event)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/events/steel-challenge");

    let conn = DbConn::get_one(client.rocket()).await.unwrap();
    let credits = conn
        .run(move |c| ivan.get_info(c).unwrap().get_credits())
        .await;
    assert_eq!(credits, 1);

    let calendar = client.get("/events?year=2026&month=11").dispatch().await;
    assert!(calendar.into_string().await.unwrap().contains("Steel challenge"));
}

#[rocket::async_test]
async fn wishlist_round_trip() {
    let app = app().await;
    let client = &app.client;
    register(client, "admin@example.org").await;

    let response = client
        .post("/marketplace/new")
        .header(ContentType::Form)
        .body(urlencoded(&[
            ("listing_type", "sale"),
            ("category", "optics"),
            ("title", "Red dot sight"),
            ("description", "Barely used"),
            ("price", "$249.99"),
        ]))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    let listing_id = location(&response)
        .rsplit("listing_id=")
        .next()
        .unwrap()
        .to_string();

    let response = client
        .post("/api/wishlist")
        .header(ContentType::JSON)
        .body(json!({ "listing_id": listing_id }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    // Saving twice is refused
    let response = client
        .post("/api/wishlist")
        .header(ContentType::JSON)
        .body(json!({ "listing_id": listing_id }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let check: Value = client
        .get(format!("/api/wishlist/check/{}", listing_id))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(check["wishlisted"], true);

    let page = client.get("/wishlist").dispatch().await;
    let body = page.into_string().await.unwrap();
    assert!(body.contains("Red dot sight"));
    assert!(body.contains("$249.99"));

    let removed: Value = client
        .delete(format!("/api/wishlist/{}", listing_id))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(removed["removed"], true);

    // The buttons on the listing and wishlist pages
    let response = client
        .post(format!("/wishlist/add?listing_id={}", listing_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), format!("/marketplace/{}", listing_id));
    let body = client.get("/wishlist").dispatch().await.into_string().await.unwrap();
    assert!(body.contains("Red dot sight"));

    let response = client
        .post(format!("/wishlist/remove?listing_id={}", listing_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/wishlist");
    let check: Value = client
        .get(format!("/api/wishlist/check/{}", listing_id))
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(check["wishlisted"], false);
}
