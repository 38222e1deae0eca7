use super::users::*;
use rocket::{
    http::Status,
    outcome::{try_outcome, Outcome},
    request::FromRequest,
};
use std::marker::PhantomData;

pub struct Admin;
// Admins can always sell
pub struct Seller;

pub struct Role<T> {
    plhdr: PhantomData<T>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Role<Admin> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);
        if user.info.is_admin() {
            Outcome::Success(Role { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Role<Seller> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);
        if user.info.can_sell() {
            Outcome::Success(Role { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}
