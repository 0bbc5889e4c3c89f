use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Public Router Module
///
/// Defines endpoints accessible to any client, anonymous or logged-in.
/// Identity still matters inside several of these handlers (navigation,
/// comment submission), but it is resolved per request and never required.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and smoke tests.
        .route("/health", get(|| async { "ok" }))
        // GET/POST /register
        // Registration form; successful submission logs the new user in.
        .route("/register", get(handlers::register_form).post(handlers::register))
        // GET/POST /login
        // Login form; failed attempts redirect back here with a flash message.
        .route("/login", get(handlers::login_form).post(handlers::login))
        // GET /logout
        // Clears the session regardless of prior state.
        .route("/logout", get(handlers::logout))
        // GET /
        // Lists every post in storage order.
        .route("/", get(handlers::get_all_posts))
        // GET/POST /post/{id}
        // Post detail with comments; POST accepts the comment form.
        // Anonymous comment submissions persist nothing.
        .route("/post/{id}", get(handlers::show_post).post(handlers::add_comment))
        // Static informational pages.
        .route("/about", get(handlers::about))
        .route("/contact", get(handlers::contact))
}
