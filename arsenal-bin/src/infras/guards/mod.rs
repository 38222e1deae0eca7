// Session-backed profile guards
mod users;
// Role-profile and ownership system that controls the authorization of a specific operation.
mod auths;
mod roles;

pub use self::{auths::*, roles::*, users::*};
