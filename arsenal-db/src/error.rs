use bcrypt::BcryptError;
use thiserror::Error;

pub type ArsenalDbResult<T> = Result<T, ArsenalDbError>;

#[derive(Error, Debug)]
pub enum ArsenalDbError {
    #[error("errored on hashing using bcrypt: {0}")]
    HashError(#[from] BcryptError),

    #[error("database query failed with: {0}")]
    QueryError(#[from] diesel::result::Error),

    #[error("failed to (de)serialize json: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("failed to parse uuid: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("invalid value: {0}")]
    InvalidEnumValue(String),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least 8 characters long")]
    WeakPassword,

    #[error("email has already been registered")]
    UserRegistered,

    #[error("no user found given the information")]
    UserNotFound,

    #[error("password was incorrect")]
    IncorrectPassword,

    #[error("the user has been disabled")]
    DisabledUser,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("establishment doesn't exist")]
    EstablishmentNotFound,

    #[error("establishment doesn't match the requested kind")]
    EstablishmentKindMismatch,

    #[error("a post can only be associated with one establishment")]
    AmbiguousAssociation,

    #[error("post doesn't exist")]
    PostNotFound,

    #[error("listing doesn't exist")]
    ListingNotFound,

    #[error("price cannot be negative")]
    InvalidPrice,

    #[error("a listing can have at most {0} images")]
    TooManyImages(usize),

    #[error("listing has already been wishlisted")]
    AlreadyWishlisted,

    #[error("event doesn't exist")]
    EventNotFound,

    #[error("event cannot end before it starts")]
    InvalidEventDates,

    #[error("not enough credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("credit amount must be positive")]
    InvalidCreditAmount,

    #[error("operation not permitted for this user")]
    NotPermitted,
}

impl ArsenalDbError {
    /// Whether the error means that the requested row doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QueryError(diesel::result::Error::NotFound)
                | Self::UserNotFound
                | Self::EstablishmentNotFound
                | Self::PostNotFound
                | Self::ListingNotFound
                | Self::EventNotFound
        )
    }

    /// Whether the error was caused by invalid user input rather than the backend.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEnumValue(_)
                | Self::InvalidEmail
                | Self::WeakPassword
                | Self::UserRegistered
                | Self::IncorrectPassword
                | Self::MissingField(_)
                | Self::EstablishmentKindMismatch
                | Self::AmbiguousAssociation
                | Self::InvalidPrice
                | Self::TooManyImages(_)
                | Self::AlreadyWishlisted
                | Self::InvalidEventDates
                | Self::InsufficientCredits { .. }
                | Self::InvalidCreditAmount
        )
    }
}
