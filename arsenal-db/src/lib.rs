use chrono::NaiveDateTime;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod credits;
pub mod enums;
pub mod error;
pub mod establishments;
pub mod events;
pub mod listings;
pub mod posts;
pub mod profiles;
#[rustfmt::skip]
mod schema;
pub mod slugs;
pub mod test_utils;
pub mod wishlist;

/// Migrations shipped inside the binary, run once at ignition and in tests.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Enum representing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// Enum used for comparison operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// Greater than
    GreaterThan,
    /// Less than,
    LessThan,
    /// Greater than or equal to,
    GreaterEqual,
    /// Less than or equal to
    LessEqual,
    NotEqual,
    Equal,
}

// All timestamps are stored as naive UTC
pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
