use super::*;
use crate::{
    establishments::IncompleteEstablishment, profiles::ProfileForm,
    test_utils::establish_connection,
};

fn user(conn: &mut SqliteConnection, email: &str) -> ProfileId {
    ProfileForm::new(email, "Writer", "strongpasswd")
        .create(conn)
        .unwrap()
}

fn store(conn: &mut SqliteConnection, owner: &ProfileId, name: &str) -> EstablishmentId {
    IncompleteEstablishment::new(EstablishmentKind::Store, name, "Austin, TX")
        .create(conn, owner)
        .unwrap()
}

#[test]
fn association_columns_are_exclusive() {
    assert_eq!(AssociationColumns::default().into_association().unwrap(), None);
    assert_eq!(
        AssociationColumns {
            club_id: Some("c".into()),
            ..Default::default()
        }
        .into_association()
        .unwrap(),
        Some(Association::Club("c".into()))
    );
    assert!(matches!(
        AssociationColumns {
            store_id: Some("s".into()),
            range_id: Some("r".into()),
            ..Default::default()
        }
        .into_association(),
        Err(ArsenalDbError::AmbiguousAssociation)
    ));

    let columns = AssociationColumns::from(Some(&Association::Servicing("x".into())));
    assert_eq!(columns.servicing_id.as_deref(), Some("x"));
    assert_eq!(columns.store_id, None);
}

#[test]
fn edit_preserves_association() {
    let mut conn = establish_connection();
    let author = user(&mut conn, "writer@example.org");
    let shop = store(&mut conn, &author, "Iron Works");
    let association = Association::Store(shop.get_id().to_string());

    let post = IncompletePost::new("Spring sale", "<p>Everything 10% off</p>", PostCategory::News)
        .create(&mut conn, &author, Some(&association))
        .unwrap();

    let updated = post
        .update(
            &mut conn,
            IncompletePost::new("Summer sale", "<p>Everything 20% off</p>", PostCategory::News),
        )
        .unwrap();

    let columns = updated.get_association_columns();
    assert_eq!(columns.store_id.as_deref(), Some(shop.get_id()));
    assert_eq!(columns.club_id, None);
    assert_eq!(updated.get_title(), "Summer sale");
    assert_eq!(updated.get_slug(), "summer-sale");
    assert_eq!(updated.get_content(), "<p>Everything 20% off</p>");
    assert_eq!(
        PostFinder::new(&mut conn, None)
            .association(&association)
            .count()
            .unwrap(),
        1
    );
}

#[test]
fn resolve_association() {
    let mut conn = establish_connection();
    let author = user(&mut conn, "writer@example.org");
    let stranger = user(&mut conn, "stranger@example.org");
    let author_info = author.get_info(&mut conn).unwrap();

    // Nothing owned, nothing requested
    assert_eq!(Association::resolve(&mut conn, &author_info, None).unwrap(), None);

    let shop = store(&mut conn, &author, "Iron Works");
    assert_eq!(
        Association::resolve(&mut conn, &author_info, None).unwrap(),
        Some(Association::Store(shop.get_id().to_string()))
    );
    assert_eq!(
        Association::resolve(
            &mut conn,
            &author_info,
            Some((EstablishmentKind::Store, shop.get_id()))
        )
        .unwrap(),
        Some(Association::Store(shop.get_id().to_string()))
    );
    assert!(matches!(
        Association::resolve(
            &mut conn,
            &author_info,
            Some((EstablishmentKind::Club, shop.get_id()))
        ),
        Err(ArsenalDbError::EstablishmentKindMismatch)
    ));

    let stranger_info = stranger.get_info(&mut conn).unwrap();
    assert!(matches!(
        Association::resolve(
            &mut conn,
            &stranger_info,
            Some((EstablishmentKind::Store, shop.get_id()))
        ),
        Err(ArsenalDbError::NotPermitted)
    ));

    // With two establishments the choice is ambiguous, so nothing is picked
    store(&mut conn, &author, "Copper Works");
    assert_eq!(Association::resolve(&mut conn, &author_info, None).unwrap(), None);
}

#[test]
fn toggle_published_round_trip() {
    let mut conn = establish_connection();
    let author = user(&mut conn, "writer@example.org");
    let post = IncompletePost::new("Cleaning 101", "<p>Oil it</p>", PostCategory::Guides)
        .featured_image("http://localhost:9000/blog-images/a.png")
        .create(&mut conn, &author, None)
        .unwrap();
    let before = post.get_info(&mut conn).unwrap();
    assert!(!before.is_published());

    let after = post.set_published(&mut conn, !before.is_published()).unwrap();
    assert!(after.is_published());
    assert_eq!(after.get_title(), before.get_title());
    assert_eq!(after.get_content(), before.get_content());
    assert_eq!(after.get_featured_image(), before.get_featured_image());
    assert_eq!(after.get_updated_at(), before.get_updated_at());

    assert_eq!(
        PostFinder::new(&mut conn, None)
            .published(true)
            .category(PostCategory::Guides)
            .count()
            .unwrap(),
        1
    );
    assert!(!post.set_published(&mut conn, false).unwrap().is_published());
}

#[test]
fn count_views_and_slugs() {
    let mut conn = establish_connection();
    let author = user(&mut conn, "writer@example.org");
    let first = IncompletePost::new("Range report", "<p>a</p>", PostCategory::News)
        .create(&mut conn, &author, None)
        .unwrap();
    let second = IncompletePost::new("Range report", "<p>b</p>", PostCategory::News)
        .create(&mut conn, &author, None)
        .unwrap();
    assert_eq!(second.get_info(&mut conn).unwrap().get_slug(), "range-report-2");

    first.increment_views(&mut conn).unwrap();
    first.increment_views(&mut conn).unwrap();
    assert_eq!(first.get_info(&mut conn).unwrap().get_view_count(), 2);

    // Editing keeps its own slug instead of colliding with itself
    let edited = second
        .update(
            &mut conn,
            IncompletePost::new("Range report", "<p>c</p>", PostCategory::News),
        )
        .unwrap();
    assert_eq!(edited.get_slug(), "range-report-2");

    assert!(matches!(
        IncompletePost::new("", "<p>a</p>", PostCategory::News).create(&mut conn, &author, None),
        Err(ArsenalDbError::MissingField("title"))
    ));
    assert!(matches!(
        PostId::find(&mut conn, "missing"),
        Err(ArsenalDbError::PostNotFound)
    ));
}

#[test]
fn delete_by_author() {
    let mut conn = establish_connection();
    let author = user(&mut conn, "writer@example.org");
    let other = user(&mut conn, "other@example.org");
    IncompletePost::new("Mine", "<p>a</p>", PostCategory::News)
        .create(&mut conn, &author, None)
        .unwrap();
    let kept = IncompletePost::new("Theirs", "<p>b</p>", PostCategory::News)
        .create(&mut conn, &other, None)
        .unwrap();

    assert_eq!(PostFinder::delete_by_author(&mut conn, &author).unwrap(), 1);
    assert_eq!(PostFinder::list(&mut conn).unwrap(), vec![kept]);
}
