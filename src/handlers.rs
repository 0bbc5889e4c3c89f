use crate::{
    AppState,
    auth::{self, AdminUser, CurrentUser, IncomingFlash},
    config::Env,
    models::{CommentForm, LoginForm, PostForm, RegisterForm},
    repository::{PostWriteOutcome, RegistrationOutcome},
    views,
};
use axum::{
    extract::{Form, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;

// --- Response Helpers ---

/// Queue a flash message and redirect (GET-after-POST). If the cookie header
/// cannot be built the redirect still happens, minus the message.
fn flash_redirect(message: &str, to: &str) -> Response {
    match auth::flash_cookie(message) {
        Ok(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(to)).into_response(),
        Err(e) => {
            tracing::error!("flash cookie error: {:?}", e);
            Redirect::to(to).into_response()
        }
    }
}

/// Send a rendered page, clearing the flash cookie when the page consumed a
/// pending message. Keeps flashes one-shot.
fn rendered(page: Html<String>, consumed_flash: bool) -> Response {
    if consumed_flash {
        if let Ok(cookie) = auth::clear_flash_cookie() {
            return (AppendHeaders([(SET_COOKIE, cookie)]), page).into_response();
        }
    }
    page.into_response()
}

/// Establish a session for the user: random token, keyed hash stored
/// server-side, raw token handed back in the cookie header.
async fn start_session(state: &AppState, user_id: i64) -> Option<HeaderValue> {
    let token = auth::generate_session_token();
    let token_hash = auth::hash_session_token(&state.config.session_secret, &token);
    if let Err(e) = state
        .repo
        .create_session(user_id, token_hash, auth::SESSION_TTL_SECONDS)
        .await
    {
        tracing::error!("create_session error: {:?}", e);
        return None;
    }
    auth::session_cookie(&token, state.config.env == Env::Production).ok()
}

// --- Registration ---

/// GET /register
pub async fn register_form(
    CurrentUser(user): CurrentUser,
    IncomingFlash(flash): IncomingFlash,
) -> Response {
    let consumed = flash.is_some();
    rendered(
        views::register_page(user.as_ref(), flash.as_deref(), &RegisterForm::default(), &[]),
        consumed,
    )
}

/// POST /register
///
/// Validation failures re-render the form with inline messages and persist
/// nothing. A duplicate name or email aborts with a flash message and a
/// redirect to the login page. Success logs the new user straight in.
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        return views::register_page(None, None, &form, &errors).into_response();
    }

    let password_hash = match auth::hash_password(&form.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("password hashing failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state
        .repo
        .create_user(
            form.name.trim().to_string(),
            form.email.trim().to_string(),
            password_hash,
        )
        .await
    {
        Ok(RegistrationOutcome::Created(user)) => match start_session(&state, user.id).await {
            Some(cookie) => {
                (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")).into_response()
            }
            None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        },
        Ok(RegistrationOutcome::Conflict) => {
            flash_redirect("This email is already registered! Log in!", "/login")
        }
        Err(e) => {
            tracing::error!("register error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Login / Logout ---

/// GET /login
pub async fn login_form(
    CurrentUser(user): CurrentUser,
    IncomingFlash(flash): IncomingFlash,
) -> Response {
    let consumed = flash.is_some();
    rendered(
        views::login_page(user.as_ref(), flash.as_deref(), &LoginForm::default(), &[]),
        consumed,
    )
}

/// POST /login
///
/// Unknown email and wrong password get distinct flash messages, both
/// redirecting back to the login page rather than erroring.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        return views::login_page(None, None, &form, &errors).into_response();
    }

    let Some(user) = state.repo.get_user_by_email(form.email.trim()).await else {
        return flash_redirect("No such user found!", "/login");
    };

    if !auth::verify_password(&user.password_hash, &form.password) {
        return flash_redirect("Sorry, wrong password!", "/login");
    }

    match start_session(&state, user.id).await {
        Some(session) => match auth::flash_cookie("Welcome back!") {
            Ok(flash) => (
                AppendHeaders([(SET_COOKIE, session), (SET_COOKIE, flash)]),
                Redirect::to("/"),
            )
                .into_response(),
            Err(_) => (AppendHeaders([(SET_COOKIE, session)]), Redirect::to("/")).into_response(),
        },
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// GET /logout
///
/// Deletes the session row when a token was presented and always clears the
/// cookie, so repeating the request is harmless.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = auth::extract_session_token(&headers) {
        let token_hash = auth::hash_session_token(&state.config.session_secret, &token);
        if let Err(e) = state.repo.delete_session(&token_hash).await {
            tracing::error!("delete_session error: {:?}", e);
        }
    }

    match auth::clear_session_cookie(state.config.env == Env::Production) {
        Ok(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")).into_response(),
        Err(_) => Redirect::to("/").into_response(),
    }
}

// --- Reading ---

/// GET / — unconditional listing of every post.
pub async fn get_all_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IncomingFlash(flash): IncomingFlash,
) -> Response {
    let posts = state.repo.get_posts().await;
    let consumed = flash.is_some();
    rendered(
        views::index_page(&posts, user.as_ref(), flash.as_deref()),
        consumed,
    )
}

/// GET /post/{id} — post detail plus all of its comments.
pub async fn show_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    IncomingFlash(flash): IncomingFlash,
    Path(post_id): Path<i64>,
) -> Response {
    let Some(post) = state.repo.get_post(post_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let comments = state.repo.get_comments(post_id).await;
    let consumed = flash.is_some();
    rendered(
        views::post_page(&post, &comments, user.as_ref(), flash.as_deref(), &[]),
        consumed,
    )
}

// --- Commenting ---

/// POST /post/{id}
///
/// Authenticated callers get their comment persisted followed by a redirect
/// back to the post. Anonymous callers persist nothing: the page re-renders
/// with a message and the typed text is lost.
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post) = state.repo.get_post(post_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(user) = user else {
        let comments = state.repo.get_comments(post_id).await;
        return views::post_page(
            &post,
            &comments,
            None,
            Some("Please log in to leave comments"),
            &[],
        )
        .into_response();
    };

    let errors = form.validate();
    if !errors.is_empty() {
        let comments = state.repo.get_comments(post_id).await;
        return views::post_page(&post, &comments, Some(&user), None, &errors).into_response();
    }

    match state.repo.add_comment(post_id, user.id, form.text).await {
        Ok(_) => Redirect::to(&format!("/post/{post_id}")).into_response(),
        Err(e) => {
            tracing::error!("add_comment error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Administration ---

/// GET /new-post
pub async fn new_post_form(AdminUser(admin): AdminUser) -> Html<String> {
    views::post_form_page(Some(&admin), false, None, &PostForm::default(), &[])
}

/// POST /new-post
///
/// The post date is fixed here, at submission time, as the server's current
/// calendar date. A duplicate title re-renders the form with a message
/// instead of surfacing a storage error.
pub async fn create_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        return views::post_form_page(Some(&admin), false, None, &form, &errors).into_response();
    }

    let date = Utc::now().format("%B %d, %Y").to_string();
    match state.repo.create_post(form.clone(), date, admin.id).await {
        Ok(PostWriteOutcome::Saved(_)) => Redirect::to("/").into_response(),
        Ok(PostWriteOutcome::DuplicateTitle) => views::post_form_page(
            Some(&admin),
            false,
            None,
            &form,
            &["A post with this title already exists.".to_string()],
        )
        .into_response(),
        // Inserts have no update target; this arm cannot be reached.
        Ok(PostWriteOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("create_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /edit-post/{id} — form pre-filled with the stored field values.
pub async fn edit_post_form(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Response {
    let Some(post) = state.repo.get_post(post_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let form = PostForm {
        title: post.title,
        subtitle: post.subtitle,
        img_url: post.img_url,
        body: post.body,
    };
    views::post_form_page(Some(&admin), true, Some(post_id), &form, &[]).into_response()
}

/// POST /edit-post/{id}
///
/// Overwrites every form field and reassigns the author to the acting
/// administrator. The creation date is preserved.
pub async fn edit_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        return views::post_form_page(Some(&admin), true, Some(post_id), &form, &errors)
            .into_response();
    }

    match state.repo.update_post(post_id, form.clone(), admin.id).await {
        Ok(PostWriteOutcome::Saved(post)) => {
            Redirect::to(&format!("/post/{}", post.id)).into_response()
        }
        Ok(PostWriteOutcome::DuplicateTitle) => views::post_form_page(
            Some(&admin),
            true,
            Some(post_id),
            &form,
            &["A post with this title already exists.".to_string()],
        )
        .into_response(),
        Ok(PostWriteOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("edit_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /delete/{id}
///
/// Deletes the post and its comments in one transaction (the schema declares
/// no automatic cascade), then redirects to the listing.
pub async fn delete_post(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Response {
    match state.repo.delete_post(post_id).await {
        Ok(true) => Redirect::to("/").into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("delete_post error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// --- Static Pages ---

/// GET /about
pub async fn about(CurrentUser(user): CurrentUser) -> Html<String> {
    views::about_page(user.as_ref())
}

/// GET /contact
pub async fn contact(CurrentUser(user): CurrentUser) -> Html<String> {
    views::contact_page(user.as_ref())
}
