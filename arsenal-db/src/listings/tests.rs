use super::*;
use crate::{profiles::ProfileForm, test_utils::establish_connection};

fn seller(conn: &mut SqliteConnection) -> ProfileId {
    ProfileForm::new("seller@example.org", "Seller", "strongpasswd")
        .create(conn)
        .unwrap()
}

fn listing(title: &str, category: ListingCategory, price: i64) -> IncompleteListing {
    IncompleteListing::new(ListingType::Sale, category, title, "Good condition", price)
}

#[test]
fn create_listing() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    let id = listing("Bolt action rifle", ListingCategory::Firearms, 85_000)
        .images(vec!["http://localhost:9000/listings/a.jpg".into()])
        .create(&mut conn, &user)
        .unwrap();

    let info = id.get_info(&mut conn).unwrap();
    assert_eq!(info.get_status(), ListingStatus::Active);
    assert_eq!(info.get_images().unwrap().len(), 1);
    assert!(!info.is_featured());
    // Default expiry
    assert_eq!(
        *info.get_expires_at().unwrap() - *info.get_created_at(),
        Duration::days(DEFAULT_EXPIRY_DAYS)
    );
    assert!(info.is_visible(&now()));
}

#[test]
fn reject_invalid_listing() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    assert!(matches!(
        listing(" ", ListingCategory::Other, 100).create(&mut conn, &user),
        Err(ArsenalDbError::MissingField("title"))
    ));
    assert!(matches!(
        listing("Holster", ListingCategory::Accessories, -1).create(&mut conn, &user),
        Err(ArsenalDbError::InvalidPrice)
    ));
    let too_many = (0..=MAX_IMAGES).map(|i| format!("{}.png", i)).collect();
    assert!(matches!(
        listing("Holster", ListingCategory::Accessories, 100)
            .images(too_many)
            .create(&mut conn, &user),
        Err(ArsenalDbError::TooManyImages(MAX_IMAGES))
    ));
    assert_eq!(ListingFinder::list(&mut conn).unwrap().len(), 0);
}

#[test]
fn visibility_filter() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    let time = now();
    let active = listing("Active", ListingCategory::Optics, 100)
        .create(&mut conn, &user)
        .unwrap();
    listing("Expired", ListingCategory::Optics, 100)
        .expires_at(time - Duration::days(1))
        .create(&mut conn, &user)
        .unwrap();
    let sold = listing("Sold", ListingCategory::Optics, 100)
        .create(&mut conn, &user)
        .unwrap();
    sold.get_info(&mut conn)
        .unwrap()
        .set_status(ListingStatus::Sold)
        .update(&mut conn)
        .unwrap();
    let forever = listing("No expiry", ListingCategory::Optics, 100)
        .create(&mut conn, &user)
        .unwrap();
    let forever_info = forever
        .get_info(&mut conn)
        .unwrap()
        .set_expires_at(None)
        .update(&mut conn)
        .unwrap();
    assert!(forever_info.is_visible(&time));

    let mut visible: Vec<String> = ListingFinder::new(&mut conn, None)
        .visible(time)
        .search()
        .unwrap()
        .into_iter()
        .map(|x| x.get_id().to_string())
        .collect();
    visible.sort();
    let mut expected = vec![active.get_id().to_string(), forever.get_id().to_string()];
    expected.sort();
    assert_eq!(visible, expected);
}

#[test]
fn filter_and_sort() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    listing("Cheap scope", ListingCategory::Optics, 5_000)
        .create(&mut conn, &user)
        .unwrap();
    let pricey = listing("Pricey scope", ListingCategory::Optics, 150_000)
        .create(&mut conn, &user)
        .unwrap();
    listing("Brass", ListingCategory::Reloading, 2_000)
        .create(&mut conn, &user)
        .unwrap();

    let optics = ListingFinder::new(&mut conn, None)
        .category(ListingCategory::Optics)
        .order_by(ListingOrder::Price, Order::Asc)
        .search_info()
        .unwrap();
    assert_eq!(optics.len(), 2);
    assert_eq!(optics[0].get_title(), "Cheap scope");

    assert_eq!(
        ListingFinder::new(&mut conn, None)
            .price(3_000, Cmp::GreaterEqual)
            .count()
            .unwrap(),
        2
    );

    // Featured ones float to the top whatever the key
    pricey
        .get_info(&mut conn)
        .unwrap()
        .set_featured(true)
        .update(&mut conn)
        .unwrap();
    let sorted = ListingFinder::new(&mut conn, None)
        .order_by(ListingOrder::Price, Order::Asc)
        .search_info()
        .unwrap();
    assert_eq!(sorted[0].get_title(), "Pricey scope");
    assert_eq!(sorted[1].get_title(), "Brass");
}

#[test]
fn toggle_featured_round_trip() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    let id = listing("Red dot", ListingCategory::Optics, 12_000)
        .create(&mut conn, &user)
        .unwrap();
    let before = id.get_info(&mut conn).unwrap();
    let after = before
        .clone()
        .set_featured(!before.is_featured())
        .update(&mut conn)
        .unwrap();
    assert!(after.is_featured());
    assert_eq!(after.get_title(), before.get_title());
    assert_eq!(after.get_price(), before.get_price());
    assert_eq!(after.get_status(), before.get_status());
    assert_eq!(after.get_expires_at(), before.get_expires_at());
}

#[test]
fn manage_images() {
    let mut conn = establish_connection();
    let user = seller(&mut conn);
    let id = listing("Reloading press", ListingCategory::Reloading, 30_000)
        .create(&mut conn, &user)
        .unwrap();
    for i in 0..MAX_IMAGES {
        id.add_image(&mut conn, &format!("http://localhost:9000/listings/{}.png", i))
            .unwrap();
    }
    assert!(matches!(
        id.add_image(&mut conn, "http://localhost:9000/listings/extra.png"),
        Err(ArsenalDbError::TooManyImages(MAX_IMAGES))
    ));
    let info = id
        .remove_image(&mut conn, "http://localhost:9000/listings/0.png")
        .unwrap();
    let images = info.get_images().unwrap();
    assert_eq!(images.len(), MAX_IMAGES - 1);
    assert_eq!(images[0], "http://localhost:9000/listings/1.png");

    // Editing the text keeps the pictures
    let edited = id
        .update(
            &mut conn,
            IncompleteListing::new(
                ListingType::Wanted,
                ListingCategory::Reloading,
                "Reloading press wanted",
                "Any brand",
                25_000,
            ),
        )
        .unwrap();
    assert_eq!(edited.get_images().unwrap().len(), MAX_IMAGES - 1);
    assert_eq!(edited.get_listing_type(), ListingType::Wanted);
}
