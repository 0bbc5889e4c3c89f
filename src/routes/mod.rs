/// Router Module Index
///
/// Organizes the application's routing logic into access-segregated modules
/// so the admin guard is applied explicitly at the module level (via an Axum
/// layer) instead of being repeated ad hoc per handler registration.
///
/// The only authenticated-but-not-administrative action, commenting, lives on
/// the public post route with an in-handler identity check, so two modules
/// suffice.

/// Routes accessible to all users (anonymous included): registration, login,
/// the post listing and detail pages, and the static pages.
pub mod public;

/// Routes restricted to administrators: post creation, editing, deletion.
/// Guarded by the `AdminUser` extractor middleware.
pub mod admin;
