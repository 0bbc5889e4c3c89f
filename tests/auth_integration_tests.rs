use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use blog_portal::{
    AppState,
    auth::{
        self, AdminUser, CurrentUser, hash_password, hash_session_token, verify_password,
    },
    config::AppConfig,
    models::{BlogPost, Comment, PostForm, User},
    repository::{PostWriteOutcome, RegistrationOutcome, Repository},
};
use std::sync::Arc;

// --- Mock Repository for Identity Resolution ---

#[derive(Default)]
struct MockAuthRepo {
    user_to_return: Option<User>,
    // Identity only resolves when the presented hash matches this value,
    // mirroring the real lookup-by-hash contract.
    expected_hash: Option<Vec<u8>>,
}

#[async_trait]
impl Repository for MockAuthRepo {
    async fn session_user(&self, session_hash: &[u8]) -> Option<User> {
        match &self.expected_hash {
            Some(expected) if expected.as_slice() == session_hash => self.user_to_return.clone(),
            _ => None,
        }
    }

    // Placeholders: the extractor under test only touches session_user.
    async fn get_posts(&self) -> Vec<BlogPost> {
        vec![]
    }
    async fn get_post(&self, _id: i64) -> Option<BlogPost> {
        None
    }
    async fn create_post(
        &self,
        _form: PostForm,
        _date: String,
        _author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error> {
        Ok(PostWriteOutcome::NotFound)
    }
    async fn update_post(
        &self,
        _id: i64,
        _form: PostForm,
        _author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error> {
        Ok(PostWriteOutcome::NotFound)
    }
    async fn delete_post(&self, _id: i64) -> Result<bool, sqlx::Error> {
        Ok(false)
    }
    async fn get_comments(&self, _post_id: i64) -> Vec<Comment> {
        vec![]
    }
    async fn add_comment(
        &self,
        _post_id: i64,
        _author_id: i64,
        _text: String,
    ) -> Result<Comment, sqlx::Error> {
        Ok(Comment::default())
    }
    async fn create_user(
        &self,
        _name: String,
        _email: String,
        _password_hash: String,
    ) -> Result<RegistrationOutcome, sqlx::Error> {
        Ok(RegistrationOutcome::Conflict)
    }
    async fn get_user(&self, _id: i64) -> Option<User> {
        self.user_to_return.clone()
    }
    async fn get_user_by_email(&self, _email: &str) -> Option<User> {
        None
    }
    async fn create_session(
        &self,
        _user_id: i64,
        _session_hash: Vec<u8>,
        _ttl_seconds: i64,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
    async fn delete_session(&self, _session_hash: &[u8]) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

// --- Helper Functions ---

const TEST_TOKEN: &str = "test-session-token-value";

fn reader() -> User {
    User {
        id: 2,
        name: "Bob".to_string(),
        email: "b@x.com".to_string(),
        password_hash: "phc".to_string(),
        role: "reader".to_string(),
    }
}

fn admin() -> User {
    User {
        id: 1,
        name: "Alice".to_string(),
        email: "a@x.com".to_string(),
        password_hash: "phc".to_string(),
        role: "admin".to_string(),
    }
}

fn create_app_state(user: Option<User>, token_known: bool) -> AppState {
    let config = AppConfig::default();
    let expected_hash =
        token_known.then(|| hash_session_token(&config.session_secret, TEST_TOKEN));
    AppState {
        repo: Arc::new(MockAuthRepo {
            user_to_return: user,
            expected_hash,
        }),
        config,
    }
}

/// Helper to get the mutable Parts struct from a generated Request.
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_session_cookie(mut parts: Parts, token: &str) -> Parts {
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("blog_session={token}")).unwrap(),
    );
    parts
}

// --- CurrentUser Tests ---

#[tokio::test]
async fn test_current_user_resolves_valid_cookie() {
    let app_state = create_app_state(Some(reader()), true);

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, TEST_TOKEN);

    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    let user = user.expect("cookie should resolve to the user");
    assert_eq!(user.id, 2);
    assert_eq!(user.role, "reader");
}

#[tokio::test]
async fn test_current_user_anonymous_without_cookie() {
    let app_state = create_app_state(Some(reader()), true);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(user.is_none());
}

#[tokio::test]
async fn test_current_user_anonymous_with_unknown_token() {
    let app_state = create_app_state(Some(reader()), true);

    let parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let mut parts = with_session_cookie(parts, "some-other-token");

    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert!(user.is_none(), "an unknown token must resolve to anonymous");
}

// --- AdminUser Tests ---

#[tokio::test]
async fn test_admin_user_success_for_admin_role() {
    let app_state = create_app_state(Some(admin()), true);

    let parts = get_request_parts(Method::GET, "/new-post".parse().unwrap());
    let mut parts = with_session_cookie(parts, TEST_TOKEN);

    let admin_user = AdminUser::from_request_parts(&mut parts, &app_state).await;

    assert!(admin_user.is_ok());
    assert_eq!(admin_user.unwrap().0.name, "Alice");
}

#[tokio::test]
async fn test_admin_user_forbidden_for_reader() {
    let app_state = create_app_state(Some(reader()), true);

    let parts = get_request_parts(Method::GET, "/new-post".parse().unwrap());
    let mut parts = with_session_cookie(parts, TEST_TOKEN);

    let admin_user = AdminUser::from_request_parts(&mut parts, &app_state).await;

    assert!(admin_user.is_err());
    assert_eq!(admin_user.unwrap_err(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_user_forbidden_for_anonymous() {
    let app_state = create_app_state(None, false);

    let mut parts = get_request_parts(Method::GET, "/new-post".parse().unwrap());

    let admin_user = AdminUser::from_request_parts(&mut parts, &app_state).await;

    assert!(admin_user.is_err());
    assert_eq!(admin_user.unwrap_err(), StatusCode::FORBIDDEN);
}

// --- Password Hashing Tests ---

#[test]
fn test_password_hashes_are_salted_and_verify() {
    let first = hash_password("pw1").unwrap();
    let second = hash_password("pw1").unwrap();

    // Fresh random salt per call: same password, different hashes.
    assert_ne!(first, second);
    assert!(first.starts_with("$argon2"));

    assert!(verify_password(&first, "pw1"));
    assert!(verify_password(&second, "pw1"));
    assert!(!verify_password(&first, "pw2"));
}

#[test]
fn test_malformed_stored_hash_fails_verification() {
    assert!(!verify_password("not-a-phc-string", "pw1"));
    assert!(!verify_password("", "pw1"));
}

// --- Session Token Tests ---

#[test]
fn test_session_tokens_are_unique() {
    let a = auth::generate_session_token();
    let b = auth::generate_session_token();
    assert_ne!(a, b);
    assert!(!a.is_empty());
}

#[test]
fn test_session_token_hash_is_keyed_and_stable() {
    let first = hash_session_token("secret", "token");
    let second = hash_session_token("secret", "token");
    let other_token = hash_session_token("secret", "other");
    let other_secret = hash_session_token("different", "token");

    assert_eq!(first, second);
    assert_ne!(first, other_token);
    // The same token under a different secret must not collide: stolen
    // database hashes are useless without the configured secret.
    assert_ne!(first, other_secret);
}

// --- Cookie Tests ---

#[test]
fn test_session_cookie_attributes() {
    let cookie = auth::session_cookie("tok", false).unwrap();
    let value = cookie.to_str().unwrap();
    assert!(value.starts_with("blog_session=tok;"));
    assert!(value.contains("HttpOnly"));
    assert!(value.contains("SameSite=Lax"));
    assert!(!value.contains("Secure"));

    let secure = auth::session_cookie("tok", true).unwrap();
    assert!(secure.to_str().unwrap().contains("Secure"));

    let cleared = auth::clear_session_cookie(false).unwrap();
    assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
}

#[test]
fn test_flash_cookie_round_trip() {
    let cookie = auth::flash_cookie("Welcome back!").unwrap();
    let value = cookie.to_str().unwrap().to_string();
    // Re-present the name=value pair the way a client would.
    let pair = value.split(';').next().unwrap();

    let mut headers = header::HeaderMap::new();
    headers.insert(header::COOKIE, header::HeaderValue::from_str(pair).unwrap());

    assert_eq!(
        auth::extract_flash(&headers).as_deref(),
        Some("Welcome back!")
    );
}

#[test]
fn test_extract_flash_ignores_garbage() {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::COOKIE,
        header::HeaderValue::from_static("blog_flash=!!!not-base64!!!"),
    );
    assert!(auth::extract_flash(&headers).is_none());
}
