pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Registers every route of the API.
///
/// Paths are flat (`/users`, `/tasks`) rather than scoped, because public and
/// protected endpoints interleave under the same prefixes; auth is decided
/// per-handler by the `AuthedUser` extractor.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(users::register)
        .service(users::login)
        .service(users::me)
        .service(users::update_me)
        .service(users::delete_me)
        .service(users::logout)
        .service(users::logout_all)
        .service(users::upload_avatar)
        .service(users::delete_avatar)
        .service(users::get_avatar)
        .service(tasks::get_tasks)
        .service(tasks::create_task)
        .service(tasks::get_task)
        .service(tasks::update_task)
        .service(tasks::delete_task);
}
