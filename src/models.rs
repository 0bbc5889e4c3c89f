use regex::Regex;
use serde::Deserialize;
use sqlx::FromRow;

// --- Role Values ---

// The `role` column only ever holds one of these two values. The first
// registered user becomes the administrator; everyone after is a reader.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_READER: &str = "reader";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `users` table. `name` and `email` are unique
/// across all users; the password is stored only as an Argon2id PHC string.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    // Authorization capability field: 'admin' or 'reader'.
    pub role: String,
}

impl User {
    /// Capability check used by the admin guard. All authorization goes
    /// through this method rather than comparing identifiers.
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// BlogPost
///
/// A post record from the `blog_posts` table. The `date` field is a
/// preformatted display string ("June 03, 2024") fixed at creation time.
#[derive(Debug, Clone, FromRow, Default)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    // Rich text HTML, authored by an administrator.
    pub body: String,
    pub img_url: String,
    // FK to users.id. Reassigned to the editing identity on every edit.
    pub author_id: i64,
    // Loaded via a JOIN with `users` in listing/detail queries.
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// Comment
///
/// A comment record from the `comments` table, augmented with the author's
/// name and email (a join operation). The email feeds avatar URL generation
/// in the presentation layer and is never rendered directly.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[sqlx(default)]
    pub author_email: Option<String>,
}

// --- Form Payloads (Input Schemas) ---

/// Basic email format check on already-trimmed input.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// RegisterForm
///
/// Input payload for POST /register.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    /// Server-side validation. Returns one message per failed field;
    /// an empty vec means the form may be persisted.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required.".to_string());
        }
        if !valid_email(self.email.trim()) {
            errors.push("A valid email address is required.".to_string());
        }
        if self.password.is_empty() {
            errors.push("Password is required.".to_string());
        }
        errors
    }
}

/// LoginForm
///
/// Input payload for POST /login.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !valid_email(self.email.trim()) {
            errors.push("A valid email address is required.".to_string());
        }
        if self.password.is_empty() {
            errors.push("Password is required.".to_string());
        }
        errors
    }
}

/// PostForm
///
/// Input payload shared by the new-post and edit-post forms. The post date is
/// not part of the form: it is fixed server-side at creation time.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

impl PostForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Title is required.".to_string());
        }
        if self.subtitle.trim().is_empty() {
            errors.push("Subtitle is required.".to_string());
        }
        if self.img_url.trim().is_empty() {
            errors.push("An image URL is required.".to_string());
        }
        if self.body.trim().is_empty() {
            errors.push("Post body must not be empty.".to_string());
        }
        errors
    }
}

/// CommentForm
///
/// Input payload for the comment box on the post detail page.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Vec<String> {
        if self.text.trim().is_empty() {
            vec!["Comment text must not be empty.".to_string()]
        } else {
            Vec::new()
        }
    }
}
