// Rocket basics, i.e. struct fairing and flash msgs.
pub mod basics;
// Rocket-based database infra
pub mod database;
// Encrypted cookie sessions
pub mod session;
// Object storage for uploaded images
pub mod storage;
// Validation of uploaded files
pub mod uploads;

// Permission-related request guards
pub mod guards;
