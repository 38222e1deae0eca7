use super::*;
use crate::{
    posts::{Association, IncompletePost},
    enums::PostCategory,
    profiles::ProfileForm,
    test_utils::establish_connection,
};

fn owner(conn: &mut SqliteConnection) -> ProfileId {
    ProfileForm::new("owner@example.org", "Owner", "strongpasswd")
        .create(conn)
        .unwrap()
}

#[test]
fn filter_by_kind() {
    let mut conn = establish_connection();
    let user = owner(&mut conn);
    for name in ["North Armory", "South Armory", "East Armory"] {
        IncompleteEstablishment::new(EstablishmentKind::Store, name, "Dallas, TX")
            .create(&mut conn, &user)
            .unwrap();
    }
    for name in ["Rimfire Club", "Skeet Club"] {
        IncompleteEstablishment::new(EstablishmentKind::Club, name, "Dallas, TX")
            .create(&mut conn, &user)
            .unwrap();
    }

    let kind = "store".parse::<EstablishmentKind>().unwrap();
    let stores = EstablishmentFinder::new(&mut conn, None)
        .kind(kind)
        .search_info()
        .unwrap();
    assert_eq!(stores.len(), 3);
    assert!(stores.iter().all(|s| s.get_kind() == EstablishmentKind::Store));
    // Sorted by name
    assert_eq!(stores[0].get_business_name(), "East Armory");
    assert_eq!(EstablishmentFinder::list(&mut conn).unwrap().len(), 5);
}

#[test]
fn unique_slugs() {
    let mut conn = establish_connection();
    let user = owner(&mut conn);
    let first = IncompleteEstablishment::new(EstablishmentKind::Range, "Lone Star Range", "Austin")
        .create(&mut conn, &user)
        .unwrap();
    let second = IncompleteEstablishment::new(EstablishmentKind::Range, "Lone Star Range", "Waco")
        .create(&mut conn, &user)
        .unwrap();

    assert_eq!(
        first.get_info(&mut conn).unwrap().get_slug(),
        "lone-star-range"
    );
    assert_eq!(
        second.get_info(&mut conn).unwrap().get_slug(),
        "lone-star-range-2"
    );
    assert_eq!(
        EstablishmentFinder::new(&mut conn, None)
            .slug("lone-star-range-2")
            .first()
            .unwrap(),
        second
    );
}

#[test]
fn reject_missing_fields() {
    let mut conn = establish_connection();
    let user = owner(&mut conn);
    assert!(matches!(
        IncompleteEstablishment::new(EstablishmentKind::Store, "  ", "Austin").create(&mut conn, &user),
        Err(ArsenalDbError::MissingField("business name"))
    ));
    assert!(matches!(
        IncompleteEstablishment::new(EstablishmentKind::Store, "Shop", "").create(&mut conn, &user),
        Err(ArsenalDbError::MissingField("location"))
    ));
    assert!(matches!(
        EstablishmentId::find(&mut conn, "missing"),
        Err(ArsenalDbError::EstablishmentNotFound)
    ));
}

#[test]
fn update_establishment() {
    let mut conn = establish_connection();
    let user = owner(&mut conn);
    let id = IncompleteEstablishment::new(EstablishmentKind::Servicing, "Gunsmith Joe", "Reno")
        .phone("555-0100")
        .create(&mut conn, &user)
        .unwrap();
    id.get_info(&mut conn)
        .unwrap()
        .set_logo_url("http://localhost:9000/establishments/logo.png")
        .update(&mut conn)
        .unwrap();

    // The kind in the form is ignored
    let updated = id
        .update(
            &mut conn,
            IncompleteEstablishment::new(EstablishmentKind::Store, "Gunsmith Joe's", "Reno, NV")
                .website("https://joe.example.org")
                .phone(""),
        )
        .unwrap();
    assert_eq!(updated.get_kind(), EstablishmentKind::Servicing);
    assert_eq!(updated.get_slug(), "gunsmith-joe-s");
    assert_eq!(updated.get_location(), "Reno, NV");
    assert_eq!(updated.get_phone(), None);
    assert_eq!(updated.get_website(), Some("https://joe.example.org"));
    assert_eq!(
        updated.get_logo_url(),
        Some("http://localhost:9000/establishments/logo.png")
    );
    assert!(id.owned_by(&mut conn, &user).unwrap());
}

#[test]
fn delete_detaches_posts() {
    let mut conn = establish_connection();
    let user = owner(&mut conn);
    let store = IncompleteEstablishment::new(EstablishmentKind::Store, "Iron Works", "Austin")
        .create(&mut conn, &user)
        .unwrap();
    let association = Association::Store(store.get_id().to_string());
    let post = IncompletePost::new("Grand opening", "<p>Come visit</p>", PostCategory::News)
        .create(&mut conn, &user, Some(&association))
        .unwrap();

    store.delete(&mut conn).unwrap();

    assert_eq!(EstablishmentFinder::list(&mut conn).unwrap().len(), 0);
    let info = post.get_info(&mut conn).unwrap();
    assert_eq!(info.get_association().unwrap(), None);
    assert_eq!(info.get_title(), "Grand opening");
}
