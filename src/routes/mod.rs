pub mod health;
pub mod todos;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Mounts every route. Only `/users/me/*` and `/todos/*` pass through `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::index)
        .service(health::health)
        .service(
            web::scope("/users")
                .service(users::register)
                .service(users::login)
                .service(
                    web::scope("/me")
                        .wrap(AuthMiddleware)
                        .service(users::me)
                        .service(users::change_password)
                        .service(users::logout),
                ),
        )
        .service(
            web::scope("/todos")
                .wrap(AuthMiddleware)
                .service(todos::get_todos)
                .service(todos::create_todo)
                .service(todos::get_todo)
                .service(todos::update_todo)
                .service(todos::delete_todo),
        );
}
