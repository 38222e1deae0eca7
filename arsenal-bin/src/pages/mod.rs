// Pages rendered with askama, one module per namespace
pub mod admin;
pub mod basics;
pub mod blog;
pub mod establishments;
pub mod events;
pub mod marketplace;
pub mod users;
pub mod wishlist;
