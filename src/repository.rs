use crate::models::{BlogPost, Comment, PostForm, User};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Outcome when attempting to insert a new user row.
#[derive(Debug)]
pub enum RegistrationOutcome {
    Created(User),
    /// The name or email collided with an existing account.
    Conflict,
}

/// Outcome of a post create/update. Duplicate titles are surfaced as a
/// recoverable outcome rather than a raw storage error so handlers can
/// re-render the form with a message.
#[derive(Debug)]
pub enum PostWriteOutcome {
    Saved(BlogPost),
    DuplicateTitle,
    /// Update target vanished between the form GET and the submit.
    NotFound,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, letting the
/// handlers interact with the data layer without knowing the concrete backend.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Posts ---
    // Unconditional listing in storage order; author names joined in.
    async fn get_posts(&self) -> Vec<BlogPost>;
    async fn get_post(&self, id: i64) -> Option<BlogPost>;
    async fn create_post(
        &self,
        form: PostForm,
        date: String,
        author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error>;
    // Overwrites all form fields and reassigns the author; the creation date
    // is left untouched.
    async fn update_post(
        &self,
        id: i64,
        form: PostForm,
        author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error>;
    // Deletes the post and every comment referencing it in one transaction.
    // Returns false when no post row existed.
    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Comments ---
    async fn get_comments(&self, post_id: i64) -> Vec<Comment>;
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
    ) -> Result<Comment, sqlx::Error>;

    // --- Users ---
    // The first user ever inserted receives the admin role; the decision is
    // made inside the insert statement so it cannot race.
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<RegistrationOutcome, sqlx::Error>;
    async fn get_user(&self, id: i64) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;

    // --- Sessions ---
    // Only token hashes are ever stored; raw tokens live in the cookie.
    async fn create_session(
        &self,
        user_id: i64,
        session_hash: Vec<u8>,
        ttl_seconds: i64,
    ) -> Result<(), sqlx::Error>;
    async fn session_user(&self, session_hash: &[u8]) -> Option<User>;
    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// True when the error is the storage engine reporting a violated UNIQUE
/// constraint (duplicate user name/email or post title).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

/// Creates the three entity tables plus the session table if they do not
/// exist yet. Called once at startup, and per-database in tests.
///
/// The comments table intentionally declares no ON DELETE CASCADE; post
/// deletion cascades explicitly inside `delete_post`.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            subtitle TEXT NOT NULL,
            date TEXT NOT NULL,
            body TEXT NOT NULL,
            img_url TEXT NOT NULL,
            author_id INTEGER NOT NULL REFERENCES users(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            author_id INTEGER NOT NULL REFERENCES users(id),
            post_id INTEGER NOT NULL REFERENCES blog_posts(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS user_sessions (
            session_hash BLOB PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            expires_at INTEGER NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// SQLite connection pool.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance using the initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// Column lists kept in one place so RETURNING clauses and SELECTs stay in sync.
const POST_COLUMNS: &str = "p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.author_id";

#[async_trait]
impl Repository for SqliteRepository {
    /// Unconditional read of all posts in storage order, with the author name
    /// joined in for the listing page.
    async fn get_posts(&self) -> Vec<BlogPost> {
        let query = format!(
            "SELECT {POST_COLUMNS}, u.name AS author_name \
             FROM blog_posts p JOIN users u ON u.id = p.author_id"
        );
        match sqlx::query_as::<_, BlogPost>(&query).fetch_all(&self.pool).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("get_posts error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_post(&self, id: i64) -> Option<BlogPost> {
        let query = format!(
            "SELECT {POST_COLUMNS}, u.name AS author_name \
             FROM blog_posts p JOIN users u ON u.id = p.author_id \
             WHERE p.id = ?1"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_post error: {:?}", e);
                None
            })
    }

    /// Inserts a new post. A violated title uniqueness constraint comes back
    /// as `DuplicateTitle`; every other storage failure propagates.
    async fn create_post(
        &self,
        form: PostForm,
        date: String,
        author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, BlogPost>(
            "INSERT INTO blog_posts (title, subtitle, date, body, img_url, author_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING id, title, subtitle, date, body, img_url, author_id",
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&date)
        .bind(&form.body)
        .bind(&form.img_url)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(post) => Ok(PostWriteOutcome::Saved(post)),
            Err(e) if is_unique_violation(&e) => Ok(PostWriteOutcome::DuplicateTitle),
            Err(e) => Err(e),
        }
    }

    /// Overwrites title/subtitle/image URL/body and reassigns the author to
    /// the acting identity. The stored date never changes after creation.
    async fn update_post(
        &self,
        id: i64,
        form: PostForm,
        author_id: i64,
    ) -> Result<PostWriteOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, BlogPost>(
            "UPDATE blog_posts \
             SET title = ?1, subtitle = ?2, img_url = ?3, body = ?4, author_id = ?5 \
             WHERE id = ?6 \
             RETURNING id, title, subtitle, date, body, img_url, author_id",
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&form.img_url)
        .bind(&form.body)
        .bind(author_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(post)) => Ok(PostWriteOutcome::Saved(post)),
            Ok(None) => Ok(PostWriteOutcome::NotFound),
            Err(e) if is_unique_violation(&e) => Ok(PostWriteOutcome::DuplicateTitle),
            Err(e) => Err(e),
        }
    }

    /// Deletes every comment referencing the post, then the post itself, in a
    /// single transaction. The schema declares no automatic cascade.
    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn get_comments(&self, post_id: i64) -> Vec<Comment> {
        match sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.text, c.author_id, c.post_id, \
                    u.name AS author_name, u.email AS author_email \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = ?1",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!("get_comments error: {:?}", e);
                vec![]
            }
        }
    }

    async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: String,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (text, author_id, post_id) VALUES (?1, ?2, ?3) \
             RETURNING id, text, author_id, post_id",
        )
        .bind(&text)
        .bind(author_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Inserts a new user. The role is decided inside the statement: the
    /// first row ever inserted gets 'admin', all later rows 'reader'.
    async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<RegistrationOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES (?1, ?2, ?3, \
                     CASE WHEN (SELECT COUNT(*) FROM users) = 0 \
                          THEN 'admin' ELSE 'reader' END) \
             RETURNING id, name, email, password_hash, role",
        )
        .bind(&name)
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(RegistrationOutcome::Created(user)),
            Err(e) if is_unique_violation(&e) => Ok(RegistrationOutcome::Conflict),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, id: i64) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
    }

    /// Exact email match; login does the hash verification on top of this.
    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_email error: {:?}", e);
            None
        })
    }

    async fn create_session(
        &self,
        user_id: i64,
        session_hash: Vec<u8>,
        ttl_seconds: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_sessions (session_hash, user_id, expires_at) \
             VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER) + ?3)",
        )
        .bind(session_hash)
        .bind(user_id)
        .bind(ttl_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolves a presented token hash to its user, rejecting expired rows.
    /// Any storage failure degrades to an anonymous identity.
    async fn session_user(&self, session_hash: &[u8]) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.password_hash, u.role \
             FROM user_sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.session_hash = ?1 AND s.expires_at > CAST(strftime('%s','now') AS INTEGER)",
        )
        .bind(session_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("session_user error: {:?}", e);
            None
        })
    }

    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_sessions WHERE session_hash = ?1")
            .bind(session_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
