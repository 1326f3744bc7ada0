#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
};
use blog_server::{AppConfig, AppState, SqliteRepository, create_router, repository::RepositoryState};
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@blog.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// A fully wired app over a private in-memory database.
pub struct TestApp {
    pub router: Router,
    pub repo: SqliteRepository,
}

pub async fn spawn_app() -> TestApp {
    let repo = SqliteRepository::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    repo.migrate().await.expect("Failed to run database migrations.");

    let config = AppConfig {
        // Keeps hashing fast in debug builds.
        password_rounds: 1_000,
        secret_key: "test-secret-value-1234567890".to_string(),
        ..AppConfig::default()
    };
    let state = AppState::new(Arc::new(repo.clone()) as RepositoryState, config);

    TestApp {
        router: create_router(state),
        repo,
    }
}

/// application/x-www-form-urlencoded encoding of `fields`.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fn encode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                b' ' => "+".to_string(),
                _ => format!("%{b:02X}"),
            })
            .collect()
    }

    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns `name=value` for a cookie set (not cleared) by the response.
pub fn cookie_from(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(key, value)| key == name && !value.is_empty())
        })
        .map(str::to_owned)
}

/// Whether the response clears cookie `name`.
pub fn clears_cookie(response: &Response<Body>, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{name}=;")) && v.contains("Max-Age=0"))
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        cookies: &[&str],
        form: Option<String>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str, cookies: &[&str]) -> Response<Body> {
        self.request(Method::GET, path, cookies, None).await
    }

    pub async fn post_form(&self, path: &str, cookies: &[&str], fields: &[(&str, &str)]) -> Response<Body> {
        self.request(Method::POST, path, cookies, Some(form_body(fields)))
            .await
    }

    /// Follows a redirect that queued a flash message and returns the page it shows.
    pub async fn follow_flash(&self, response: Response<Body>) -> String {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let flash = cookie_from(&response, "flash").expect("No flash cookie set");
        let page = self.get(location(&response), &[&flash]).await;
        body_text(page).await
    }

    /// Registers an account and returns its session cookie.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> String {
        let response = self
            .post_form(
                "/register",
                &[],
                &[("email", email), ("password", password), ("name", name)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        cookie_from(&response, "session").expect("Registration did not start a session")
    }

    /// Registers the first account (id 1, the administrator).
    pub async fn register_admin(&self) -> String {
        self.register(ADMIN_EMAIL, ADMIN_PASSWORD, "Admin").await
    }

    /// Creates a post as the administrator and returns its id.
    pub async fn create_post(&self, admin_cookie: &str, title: &str) -> i64 {
        let response = self
            .post_form(
                "/new-post",
                &[admin_cookie],
                &[
                    ("title", title),
                    ("subtitle", "A subtitle"),
                    ("img_url", "https://images.example.com/cover.jpg"),
                    ("body", "<p>Hello <b>world</b></p>"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let id: i64 = sqlx::query_scalar("SELECT id FROM blog_posts WHERE title = ?")
            .bind(title)
            .fetch_one(self.repo.pool())
            .await
            .expect("Post was not stored");
        id
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(self.repo.pool())
            .await
            .expect("count query failed")
    }
}
