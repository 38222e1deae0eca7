use diesel_derive_enum::DbEnum;
use rocket::FromFormField;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ArsenalDbError;

// Generates `Display`, `FromStr` and `ALL` for the simple text-backed enums below.
// The textual form matches the value stored in the database and used in URLs.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ArsenalDbError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ArsenalDbError::InvalidEnumValue(s.to_string())),
                }
            }
        }
    };
}

/// The four kinds of businesses a user can run on the platform.
#[derive(DbEnum, FromFormField, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EstablishmentKind {
    Store,
    Club,
    Range,
    Servicing,
}

text_enum!(EstablishmentKind {
    Store => "store",
    Club => "club",
    Range => "range",
    Servicing => "servicing",
});

impl EstablishmentKind {
    // Human readable, plural
    pub fn label(&self) -> &'static str {
        match self {
            Self::Store => "Stores",
            Self::Club => "Clubs",
            Self::Range => "Shooting ranges",
            Self::Servicing => "Servicing",
        }
    }
}

#[derive(DbEnum, FromFormField, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    News,
    Guides,
}

text_enum!(PostCategory {
    News => "news",
    Guides => "guides",
});

impl Default for PostCategory {
    fn default() -> Self {
        Self::News
    }
}

#[derive(DbEnum, FromFormField, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Wanted,
    Trade,
}

text_enum!(ListingType {
    Sale => "sale",
    Wanted => "wanted",
    Trade => "trade",
});

#[derive(DbEnum, FromFormField, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    Firearms,
    Ammunition,
    Optics,
    Accessories,
    Reloading,
    Other,
}

text_enum!(ListingCategory {
    Firearms => "firearms",
    Ammunition => "ammunition",
    Optics => "optics",
    Accessories => "accessories",
    Reloading => "reloading",
    Other => "other",
});

#[derive(DbEnum, FromFormField, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    // Open for offers and visible in the marketplace (unless expired)
    Active,
    Sold,
    // Past its expiry, either marked so explicitly or by a cleanup
    Expired,
    // Taken down by an admin
    Suspended,
}

text_enum!(ListingStatus {
    Active => "active",
    Sold => "sold",
    Expired => "expired",
    Suspended => "suspended",
});

impl Default for ListingStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for kind in EstablishmentKind::ALL {
            assert_eq!(kind.as_str().parse::<EstablishmentKind>().unwrap(), *kind);
        }
        assert_eq!(" Guides ".parse::<PostCategory>().unwrap(), PostCategory::Guides);
        assert!("events".parse::<PostCategory>().is_err());
    }
}
