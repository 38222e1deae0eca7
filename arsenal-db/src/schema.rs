diesel::table! {
    use diesel::sql_types::*;

    credit_transactions (id) {
        id -> Text,
        profile_id -> Text,
        delta -> BigInt,
        reason -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use crate::enums::EstablishmentKindMapping;

    establishments (id) {
        id -> Text,
        owner_id -> Text,
        kind -> EstablishmentKindMapping,
        business_name -> Text,
        slug -> Text,
        logo_url -> Nullable<Text>,
        location -> Text,
        description -> Text,
        phone -> Nullable<Text>,
        email -> Nullable<Text>,
        website -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    events (id) {
        id -> Text,
        created_by -> Text,
        title -> Text,
        description -> Text,
        location -> Text,
        start_date -> Date,
        start_time -> Nullable<Time>,
        end_date -> Date,
        end_time -> Nullable<Time>,
        price -> Nullable<BigInt>,
        poster_url -> Nullable<Text>,
        slug -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use crate::enums::{ListingCategoryMapping, ListingStatusMapping, ListingTypeMapping};

    listings (id) {
        id -> Text,
        seller_id -> Text,
        listing_type -> ListingTypeMapping,
        category -> ListingCategoryMapping,
        title -> Text,
        description -> Text,
        price -> BigInt,
        images -> Text,
        status -> ListingStatusMapping,
        expires_at -> Nullable<Timestamp>,
        featured -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use crate::enums::PostCategoryMapping;

    posts (id) {
        id -> Text,
        author_id -> Text,
        title -> Text,
        slug -> Text,
        content -> Text,
        category -> PostCategoryMapping,
        published -> Bool,
        view_count -> BigInt,
        featured_image -> Nullable<Text>,
        store_id -> Nullable<Text>,
        club_id -> Nullable<Text>,
        range_id -> Nullable<Text>,
        servicing_id -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    profiles (id) {
        id -> Text,
        email -> Text,
        username -> Text,
        hashed_passwd -> Text,
        is_admin -> Bool,
        is_seller -> Bool,
        is_verified -> Bool,
        is_disabled -> Bool,
        notes -> Nullable<Text>,
        credits -> BigInt,
        created_at -> Timestamp,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    wishlist (id) {
        id -> Text,
        listing_id -> Text,
        user_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(credit_transactions -> profiles (profile_id));
diesel::joinable!(establishments -> profiles (owner_id));
diesel::joinable!(events -> profiles (created_by));
diesel::joinable!(listings -> profiles (seller_id));
diesel::joinable!(posts -> profiles (author_id));
diesel::joinable!(wishlist -> listings (listing_id));
diesel::joinable!(wishlist -> profiles (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    credit_transactions,
    establishments,
    events,
    listings,
    posts,
    profiles,
    wishlist,
);
