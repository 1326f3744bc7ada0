use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use thiserror::Error;

use crate::{AppState, models::User, repository::RepoError};

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

// Sessions last 31 days; flash messages five minutes.
const SESSION_TTL_SECS: i64 = 31 * 24 * 60 * 60;
const FLASH_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct SessionError(#[from] jsonwebtoken::errors::Error);

/// Claims
///
/// Payload of the signed session token held by the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the logged-in user, as a decimal string.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct FlashClaims {
    messages: Vec<String>,
    exp: usize,
}

/// SessionManager
///
/// Issues and checks the HS256 tokens stored in the `session` and `flash`
/// cookies. Both are signed with the configured secret, so the client can hold
/// them but not forge or alter them.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secure: bool,
}

impl SessionManager {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secure,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, SessionError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now as usize,
            exp: (now + SESSION_TTL_SECS) as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn resolve(&self, token: &str) -> Option<i64> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims.sub.parse().ok(),
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                None
            }
        }
    }

    /// Set-Cookie value that logs `user_id` in.
    pub fn login_cookie(&self, user_id: i64) -> Result<String, SessionError> {
        let token = self.issue(user_id)?;
        Ok(self.cookie(SESSION_COOKIE, &token))
    }

    /// Set-Cookie value that ends the session.
    pub fn logout_cookie(&self) -> String {
        self.expired_cookie(SESSION_COOKIE)
    }

    pub fn flash_cookie(&self, messages: &[String]) -> Result<String, SessionError> {
        let claims = FlashClaims {
            messages: messages.to_vec(),
            exp: (Utc::now().timestamp() + FLASH_TTL_SECS) as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(self.cookie(FLASH_COOKIE, &token))
    }

    pub fn read_flashes(&self, token: &str) -> Vec<String> {
        decode::<FlashClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.messages)
            .unwrap_or_default()
    }

    fn cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn expired_cookie(&self, name: &str) -> String {
        let mut cookie =
            format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Looks up a cookie value in the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Viewer
///
/// Request-scoped identity: who is making this request (if anyone) and which
/// flash messages are waiting to be shown. Populated by `load_viewer` before
/// any handler runs.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
    pub flashes: Vec<String>,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// load_viewer
///
/// Resolves the session cookie to a `User` and attaches the resulting `Viewer`
/// to the request. A missing, forged or expired token, or an id that no longer
/// maps to a user, leaves the request anonymous.
///
/// Pending flash messages are handed to the viewer. The flash cookie is
/// cleared only by a successful page, since those are the responses rendered
/// through the layout that displays flashes; redirects and error pages leave it
/// for the next page.
pub async fn load_viewer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user = match cookie_value(request.headers(), SESSION_COOKIE)
        .and_then(|token| state.sessions.resolve(token))
    {
        Some(user_id) => match state.repo.get_user(user_id).await {
            Ok(user) => Some(user),
            Err(RepoError::NotFound) => {
                tracing::debug!(user_id, "session refers to a missing user");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, user_id, "failed to load session user");
                None
            }
        },
        None => None,
    };

    let flash_token = cookie_value(request.headers(), FLASH_COOKIE).map(str::to_owned);
    let flashes = flash_token
        .as_deref()
        .map(|token| state.sessions.read_flashes(token))
        .unwrap_or_default();

    request.extensions_mut().insert(Viewer { user, flashes });

    let mut response = next.run(request).await;

    if flash_token.is_some()
        && response.status().is_success()
        && !sets_cookie(response.headers(), FLASH_COOKIE)
    {
        if let Ok(value) = HeaderValue::from_str(&state.sessions.expired_cookie(FLASH_COOKIE)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split_once('=').is_some_and(|(key, _)| key == name))
}

/// Redirects to `to`, queueing `message` for the next rendered page.
pub fn flash_redirect(sessions: &SessionManager, message: &str, to: &str) -> Response {
    match sessions.flash_cookie(&[message.to_string()]) {
        Ok(cookie) => (AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(to)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to sign flash message");
            Redirect::to(to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_round_trip() {
        let sessions = SessionManager::new("secret", false);
        let token = sessions.issue(42).unwrap();
        assert_eq!(sessions.resolve(&token), Some(42));
    }

    #[test]
    fn test_token_signed_with_other_key_is_rejected() {
        let token = SessionManager::new("one", false).issue(1).unwrap();
        assert_eq!(SessionManager::new("two", false).resolve(&token), None);
        assert_eq!(SessionManager::new("one", false).resolve("garbage"), None);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let sessions = SessionManager::new("secret", false);
        let claims = Claims {
            sub: "7".to_string(),
            iat: 0,
            exp: 1,
        };
        let token = encode(&Header::default(), &claims, &sessions.encoding).unwrap();
        assert_eq!(sessions.resolve(&token), None);
    }

    #[test]
    fn test_flash_token_carries_messages() {
        let sessions = SessionManager::new("secret", false);
        let cookie = sessions.flash_cookie(&["Password is incorrect".to_string()]).unwrap();
        let token = cookie
            .strip_prefix("flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(sessions.read_flashes(token), vec!["Password is incorrect"]);
    }

    #[test]
    fn test_cookie_value_parses_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def; flash="),
        );
        assert_eq!(cookie_value(&headers, "session"), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "flash"), None);
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_secure_flag_only_when_requested() {
        assert!(SessionManager::new("s", true).logout_cookie().ends_with("; Secure"));
        assert!(!SessionManager::new("s", false).login_cookie(1).unwrap().contains("Secure"));
    }
}
