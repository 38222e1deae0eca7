use super::users::*;
use crate::DbConn;
use arsenal_db::{
    establishments::EstablishmentId, events::EventId, listings::ListingId, posts::PostId,
};
use rocket::{
    http::Status,
    outcome::{try_outcome, IntoOutcome, Outcome},
    request::FromRequest,
};
use std::marker::PhantomData;

// Owner or admin may mutate, the ID comes from the query string
pub struct PostWritable;
pub struct EstablishmentWritable;
pub struct ListingWritable;
pub struct EventWritable;

pub struct Auth<T> {
    plhdr: PhantomData<T>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth<PostWritable> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);

        let db = try_outcome!(request.guard::<DbConn>().await);
        let post_id = try_outcome!(request
            .query_value::<String>("post_id")
            .and_then(|x| x.ok())
            .or_forward(Status::NotFound));

        if db
            .run(move |c| PostId::find(c, &post_id)?.writable_by(c, &user.info))
            .await
            .unwrap_or(false)
        {
            Outcome::Success(Auth { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth<EstablishmentWritable> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);

        let db = try_outcome!(request.guard::<DbConn>().await);
        let establishment_id = try_outcome!(request
            .query_value::<String>("establishment_id")
            .and_then(|x| x.ok())
            .or_forward(Status::NotFound));

        if user.info.is_admin()
            || db
                .run(move |c| {
                    EstablishmentId::find(c, &establishment_id)?.owned_by(c, &user.info.to_id())
                })
                .await
                .unwrap_or(false)
        {
            Outcome::Success(Auth { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth<ListingWritable> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);

        let db = try_outcome!(request.guard::<DbConn>().await);
        let listing_id = try_outcome!(request
            .query_value::<String>("listing_id")
            .and_then(|x| x.ok())
            .or_forward(Status::NotFound));

        if db
            .run(move |c| ListingId::find(c, &listing_id)?.writable_by(c, &user.info))
            .await
            .unwrap_or(false)
        {
            Outcome::Success(Auth { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth<EventWritable> {
    type Error = ();

    async fn from_request(
        request: &'r rocket::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        let user = try_outcome!(request.guard::<ProfileInfoGuard<Cookie>>().await);

        let db = try_outcome!(request.guard::<DbConn>().await);
        let event_id = try_outcome!(request
            .query_value::<String>("event_id")
            .and_then(|x| x.ok())
            .or_forward(Status::NotFound));

        if db
            .run(move |c| EventId::find(c, &event_id)?.writable_by(c, &user.info))
            .await
            .unwrap_or(false)
        {
            Outcome::Success(Auth { plhdr: PhantomData })
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}
