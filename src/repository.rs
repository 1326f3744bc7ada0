use crate::models::{Comment, NewPost, NewUser, Post, PostChanges, User};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;

/// RepoError
///
/// Persistence failures, split so callers can tell "no such row" and
/// "unique key already taken" apart from genuine database faults.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(db.message().to_string())
            }
            other => RepoError::Database(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The contract for every persistence operation the blog needs. Handlers only
/// see `Arc<dyn Repository>`, so tests can substitute their own implementation.
///
/// Lookups expecting exactly one row return `RepoError::NotFound` when nothing
/// matches; inserts and updates return `RepoError::Conflict` on a duplicate
/// email or post title.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Posts ---
    async fn get_all_posts(&self) -> RepoResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> RepoResult<Post>;
    async fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    // Touches title, subtitle, body and img_url only.
    async fn update_post(&self, id: i64, changes: PostChanges) -> RepoResult<Post>;
    // Comments on the post are removed with it (ON DELETE CASCADE).
    async fn delete_post(&self, id: i64) -> RepoResult<()>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<User>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<User>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    // --- Comments ---
    async fn add_comment(&self, post_id: i64, author_id: i64, text: String) -> RepoResult<Comment>;
    async fn get_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const POST_COLUMNS: &str = r#"
    p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.author_id,
    u.name AS author_name
"#;

/// SqliteRepository
///
/// The `Repository` implementation backed by SQLite. Every method is a single
/// statement, committed as soon as it runs.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens a pool for `url`, creating the database file when it does not exist.
    /// In-memory databases are private to a connection, so those get a pool of one.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get_all_posts(&self) -> RepoResult<Vec<Post>> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id ORDER BY p.id"
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> RepoResult<Post> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.author_id = u.id WHERE p.id = ?"
        );
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    /// create_post
    ///
    /// Inserts the post, then re-reads it so the returned row carries the author name.
    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO blog_posts (title, subtitle, date, body, img_url, author_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post.title)
        .bind(post.subtitle)
        .bind(post.date)
        .bind(post.body)
        .bind(post.img_url)
        .bind(post.author_id)
        .fetch_one(&self.pool)
        .await?;

        self.get_post(id).await
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> RepoResult<Post> {
        let result = sqlx::query(
            r#"
            UPDATE blog_posts
            SET title = ?, subtitle = ?, body = ?, img_url = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.title)
        .bind(changes.subtitle)
        .bind(changes.body)
        .bind(changes.img_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.get_post(id).await
    }

    async fn delete_post(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(RepoError::NotFound),
            _ => Ok(()),
        }
    }

    async fn get_user(&self, id: i64) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, password, name FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<User> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, email, password, name FROM users WHERE email = ?")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// The UNIQUE constraint on `email` is the final word on duplicates: two
    /// concurrent registrations that both pass the handler's pre-check still end
    /// with exactly one row, and the loser gets `RepoError::Conflict`.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password, name)
            VALUES (?, ?, ?)
            RETURNING id, email, password, name
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn add_comment(&self, post_id: i64, author_id: i64, text: String) -> RepoResult<Comment> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (text, author_id, post_id) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.author_id, c.post_id, u.name AS author_name
            FROM comments c JOIN users u ON c.author_id = u.id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comments(&self, post_id: i64) -> RepoResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.text, c.author_id, c.post_id, u.name AS author_name
            FROM comments c JOIN users u ON c.author_id = u.id
            WHERE c.post_id = ?
            ORDER BY c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
