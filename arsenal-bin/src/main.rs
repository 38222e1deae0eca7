// A few rules of thumb.
// Use request guard whenever possible to let rocket simplify the boilerplate of the otherwise complicated flow control.
// Don't use flash message everywhere, only use when needed
// If flash message needs to be displayed in place, don't use redirection, just use `Msg::in_place`. And in that case, don't accept flashmessage.
// Handle general database errors by redirecting using flash message to some big pages like `/`, `/user`. Flash message will only be used up when called.
// All for loops in templates should be able to handle empty vec.

#[macro_use]
extern crate rocket;
#[macro_use]
extern crate rocket_sync_db_pools;

pub use infras::{basics::*, database::DbConn};
use rocket::{
    figment::{
        providers::{Format, Toml},
        Figment,
    },
    shield::Shield,
    Build, Rocket,
};
use std::path::PathBuf;
use structopt::StructOpt;

mod calendar;
mod editor;
mod infras;
mod pages;
mod services;
mod table;

#[cfg(test)]
mod tests;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "arsenal-bin",
    about = "The web server for Arsenal, a marketplace for the firearms community"
)]
struct ArsenalOpts {
    /// Path to the TOML configuration file.
    #[structopt(short, long, parse(from_os_str))]
    config: PathBuf,
}

// Everything but the configuration source, shared with the tests
pub fn build(figment: Figment) -> Rocket<Build> {
    use editor::PendingImages;
    use infras::{
        basics::create_fairing,
        database::{migrations_fairing, Bootstrap, CreditPolicy},
        session::SessionConfig,
        storage::Storage,
    };

    rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(Shield::new())
        .attach(create_fairing::<SessionConfig>("session"))
        .attach(create_fairing::<CreditPolicy>("credits"))
        .attach(create_fairing::<Bootstrap>("bootstrap"))
        // Needs `Bootstrap` to be managed already
        .attach(migrations_fairing())
        .attach(Storage::fairing())
        .manage(PendingImages::default())
        .mount("/", routes![pages::basics::index, pages::basics::get_icon])
        .mount("/static", routes![pages::basics::get_file])
        .mount(
            "/user",
            routes![
                pages::users::portal,
                pages::users::portal_unsigned,
                pages::users::login_page,
                pages::users::register_page,
                services::users::login,
                services::users::register,
                services::users::logout,
                services::users::update_profile,
            ],
        )
        .mount(
            "/blog",
            routes![
                pages::blog::home_page,
                pages::blog::post_page,
                pages::blog::new_post_page,
                pages::blog::edit_post_page,
                services::blog::select_image,
                services::blog::confirm_image,
                services::blog::cancel_image,
                services::blog::edit_alt,
                services::blog::confirm_alt,
                services::blog::open_link,
                services::blog::confirm_link,
                services::blog::unlink,
                services::blog::featured_image,
                services::blog::submit,
                services::blog::delete_post,
            ],
        )
        .mount(
            "/establishments",
            routes![
                pages::establishments::directory,
                pages::establishments::kind_page,
                pages::establishments::establishment_page,
                pages::establishments::new_establishment_page,
                pages::establishments::edit_establishment_page,
                services::establishments::create_establishment,
                services::establishments::update_establishment,
                services::establishments::upload_logo,
                services::establishments::delete_establishment,
            ],
        )
        .mount(
            "/events",
            routes![
                pages::events::calendar_page,
                pages::events::event_page,
                pages::events::new_event_page,
                pages::events::edit_event_page,
                services::events::create_event,
                services::events::update_event,
                services::events::upload_poster,
                services::events::delete_event,
            ],
        )
        .mount(
            "/marketplace",
            routes![
                pages::marketplace::browse,
                pages::marketplace::listing_page,
                pages::marketplace::new_listing_page,
                pages::marketplace::edit_listing_page,
                services::listings::create_listing,
                services::listings::update_listing,
                services::listings::upload_image,
                services::listings::remove_image,
                services::listings::set_status,
                services::listings::delete_listing,
            ],
        )
        .mount(
            "/wishlist",
            routes![
                pages::wishlist::wishlist_page,
                services::wishlist::add,
                services::wishlist::remove,
            ],
        )
        .mount(
            "/admin",
            routes![
                pages::admin::dashboard,
                pages::admin::users,
                pages::admin::establishments,
                pages::admin::listings,
                pages::admin::events,
                pages::admin::posts,
                services::admin::toggle_disabled,
                services::admin::toggle_verified,
                services::admin::set_roles,
                services::admin::set_notes,
                services::admin::grant_credits,
                services::admin::delete_user,
                services::admin::create_establishment,
                services::admin::delete_establishment,
                services::admin::toggle_featured,
                services::admin::set_listing_status,
                services::admin::delete_listing,
                services::admin::delete_event,
                services::admin::toggle_published,
                services::admin::delete_post,
            ],
        )
        .mount(
            "/api",
            routes![
                services::api::list_users,
                services::api::disable_user,
                services::api::verify_user,
                services::api::set_roles,
                services::api::grant_credits,
                services::api::list_establishments,
                services::api::create_establishment,
                services::api::delete_establishment,
                services::api::publish_post,
                services::api::delete_post,
                services::api::feature_listing,
                services::api::wishlist,
                services::api::add_to_wishlist,
                services::api::remove_from_wishlist,
                services::api::check_wishlist,
            ],
        )
        .register(
            "/",
            catchers![
                pages::basics::page401,
                pages::basics::page403,
                pages::basics::page404,
                pages::basics::page422,
                pages::basics::page500
            ],
        )
        .register("/api", catchers![services::api::api_catcher])
}

#[launch]
fn rocket() -> Rocket<Build> {
    let args: ArsenalOpts = ArsenalOpts::from_args();

    // This helps us manage run-time Rocket.toml easily
    let figment = Figment::from(rocket::Config::default()).merge(Toml::file(args.config).nested());

    // According to the documentation, this will not read `Rocket.toml`
    // only Rocket::build reads it.
    build(figment)
}
