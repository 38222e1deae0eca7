use super::*;
use crate::{
    enums::{EstablishmentKind, ListingCategory, ListingType},
    establishments::{EstablishmentFinder, IncompleteEstablishment},
    listings::{IncompleteListing, ListingFinder},
    test_utils::establish_connection,
};

#[test]
fn create_profile() {
    let mut conn = establish_connection();
    ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();
    assert_eq!(ProfileFinder::list(&mut conn).unwrap().len(), 1);
}

#[test]
fn create_profile_existed() {
    let mut conn = establish_connection();
    ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();

    // Comparison should be case-insensitive
    assert!(matches!(
        ProfileForm::new("testuser@EXAMPLE.org", "Another", "strongpasswd")
            .create(&mut conn)
            .err()
            .unwrap(),
        ArsenalDbError::UserRegistered
    ));
}

#[test]
fn reject_invalid_registration() {
    let mut conn = establish_connection();
    assert!(matches!(
        ProfileForm::new("not-an-email", "Tester", "strongpasswd").create(&mut conn),
        Err(ArsenalDbError::InvalidEmail)
    ));
    assert!(matches!(
        ProfileForm::new("a@example.org", "Tester", "short").create(&mut conn),
        Err(ArsenalDbError::WeakPassword)
    ));
    assert!(matches!(
        ProfileForm::new("a@example.org", "   ", "strongpasswd").create(&mut conn),
        Err(ArsenalDbError::MissingField("username"))
    ));
    assert_eq!(ProfileFinder::list(&mut conn).unwrap().len(), 0);
}

#[test]
fn login_profile() {
    let mut conn = establish_connection();
    let id = ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();

    assert_eq!(
        ProfileId::login(&mut conn, "testuser@example.org", "strongpasswd").unwrap(),
        id
    );
    assert!(matches!(
        ProfileId::login(&mut conn, "testuser@example.org", "wrongpasswd"),
        Err(ArsenalDbError::IncorrectPassword)
    ));
    assert!(matches!(
        ProfileId::login(&mut conn, "nobody@example.org", "strongpasswd"),
        Err(ArsenalDbError::UserNotFound)
    ));

    // Disabled users cannot log in anymore
    id.get_info(&mut conn)
        .unwrap()
        .set_disabled(true)
        .update(&mut conn)
        .unwrap();
    assert!(matches!(
        ProfileId::login(&mut conn, "testuser@example.org", "strongpasswd"),
        Err(ArsenalDbError::DisabledUser)
    ));
}

#[test]
fn toggle_disabled_round_trip() {
    let mut conn = establish_connection();
    let id = ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();
    let before = id
        .get_info(&mut conn)
        .unwrap()
        .set_verified(true)
        .set_notes(Some("trusted dealer"))
        .update(&mut conn)
        .unwrap();

    let after = before
        .clone()
        .set_disabled(!before.is_disabled())
        .update(&mut conn)
        .unwrap();

    assert!(after.is_disabled());
    // Nothing else changed
    assert_eq!(after.is_verified(), before.is_verified());
    assert_eq!(after.is_admin(), before.is_admin());
    assert_eq!(after.get_notes(), Some("trusted dealer"));
    assert_eq!(after.get_username(), before.get_username());
    assert_eq!(after.get_credits(), before.get_credits());

    // Disabled profiles are filtered by `allowed`
    assert_eq!(
        ProfileFinder::new(&mut conn, None)
            .id(id.get_id())
            .allowed()
            .count()
            .unwrap(),
        0
    );
}

#[test]
fn update_profile() {
    let mut conn = establish_connection();
    let id = ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();
    let another = ProfileForm::new("Another@example.org", "Other", "strongpasswd")
        .create(&mut conn)
        .unwrap();

    id.get_info(&mut conn)
        .unwrap()
        .set_password("SomeStrongPasswd")
        .unwrap()
        .set_username("Renamed")
        .set_admin(true)
        .update(&mut conn)
        .unwrap();

    let changed = id.get_info(&mut conn).unwrap();
    assert_eq!(changed.get_username(), "Renamed");
    assert!(changed.is_admin());
    assert!(changed.verify_passwd("SomeStrongPasswd").unwrap());

    // Another user should be safe from the change
    let untouched = another.get_info(&mut conn).unwrap();
    assert_eq!(untouched.get_username(), "Other");
    assert!(!untouched.is_admin());
    assert!(untouched.verify_passwd("strongpasswd").unwrap());

    let stats = ProfileFinder::stats(&mut conn).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.admins, 1);
}

#[test]
fn delete_profile() {
    let mut conn = establish_connection();
    let user = ProfileForm::new("TestUser@example.org", "Tester", "strongpasswd")
        .create(&mut conn)
        .unwrap();
    let another = ProfileForm::new("Another@example.org", "Other", "strongpasswd")
        .create(&mut conn)
        .unwrap();

    IncompleteEstablishment::new(EstablishmentKind::Store, "Iron Works", "Austin, TX")
        .create(&mut conn, &user)
        .unwrap();
    IncompleteListing::new(
        ListingType::Sale,
        ListingCategory::Optics,
        "Red dot",
        "Barely used",
        12_000,
    )
    .create(&mut conn, &user)
    .unwrap();
    IncompleteListing::new(
        ListingType::Sale,
        ListingCategory::Optics,
        "Scope rings",
        "New",
        4_000,
    )
    .create(&mut conn, &another)
    .unwrap();

    user.delete(&mut conn).unwrap();

    assert_eq!(ProfileFinder::list(&mut conn).unwrap(), vec![another]);
    assert_eq!(ListingFinder::list(&mut conn).unwrap().len(), 1);
    assert_eq!(EstablishmentFinder::list(&mut conn).unwrap().len(), 0);
}
