use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The account allowed to create, edit and delete posts.
///
/// There is no role column: the first account ever registered receives id 1
/// and administers the blog. This keeps compatibility with existing databases,
/// but an explicit role attribute would be the sturdier model.
pub const ADMIN_USER_ID: i64 = 1;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `users` table. `password` holds the PHC-format
/// PBKDF2 hash and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
}

impl User {
    /// Whether this account is the blog administrator.
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_USER_ID
    }
}

/// Post
///
/// A blog post from the `blog_posts` table, augmented with the author's display
/// name (loaded via a JOIN in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    // Display string ("October 18, 2026"), not a timestamp.
    pub date: String,
    // Rich text HTML produced by the editor widget.
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// Comment
///
/// A comment from the `comments` table, augmented with the author's name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
    #[sqlx(default)]
    pub author_name: Option<String>,
}

// --- Write Payloads ---

/// Insert payload for a new account. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Insert payload for a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
}

/// PostChanges
///
/// The four fields an edit may touch. Identifier, author and date are not
/// editable.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}
