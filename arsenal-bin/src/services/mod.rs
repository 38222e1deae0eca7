// Form posts and other mutations, redirecting back to pages
pub mod admin;
pub mod blog;
pub mod establishments;
pub mod events;
pub mod listings;
pub mod users;
pub mod wishlist;
// JSON endpoints under `/api`
pub mod api;
