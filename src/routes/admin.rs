use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to administrator accounts:
/// creating, editing, and deleting posts.
///
/// Access Control:
/// This entire router is wrapped (in `create_router`) in a middleware layer
/// that resolves the session identity and rejects with 403 unless the user
/// carries the admin role. The handlers additionally take `AdminUser` to
/// receive the acting identity.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /new-post
        // Empty post form; submission fixes the date server-side.
        .route(
            "/new-post",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        // GET/POST /edit-post/{id}
        // Pre-filled form; submission overwrites all fields and reassigns
        // the author to the acting administrator.
        .route(
            "/edit-post/{id}",
            get(handlers::edit_post_form).post(handlers::edit_post),
        )
        // GET /delete/{id}
        // Deletes the post and, explicitly, every comment referencing it.
        .route("/delete/{id}", get(handlers::delete_post))
}
