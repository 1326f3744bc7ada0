use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Pages any visitor can open, logged in or not, plus the account flows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Every post, oldest first.
        .route("/", get(handlers::get_all_posts))
        // GET/POST /post/{id}
        // Shows a post with its comments; POST adds a comment (login required,
        // checked by the handler so anonymous visitors get a flash message).
        .route(
            "/post/{id}",
            get(handlers::show_post).post(handlers::add_comment),
        )
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
        // GET/POST /register
        // Account creation; a new account is logged in immediately.
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
}
