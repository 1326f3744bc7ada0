use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Post management. `create_router` wraps this router in the
/// `require_login` then `require_admin` guards, so anonymous visitors are sent
/// to the login page and every account other than the administrator gets 403
/// before a handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /new-post
        .route(
            "/new-post",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        // GET/POST /edit_post/{id}
        // Prefilled editor; POST rewrites title, subtitle, body and image URL.
        .route(
            "/edit_post/{id}",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        // GET /delete/{id}
        // Deletes the post and its comments, then returns to the home page.
        .route("/delete/{id}", get(handlers::delete_post))
}
