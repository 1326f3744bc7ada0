use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    models::User,
    session::{SessionManager, Viewer, flash_redirect},
};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// AuthUser
///
/// The logged-in user of the current request. Extracting it from an anonymous
/// request rejects with a redirect to `/login` and a flash message.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // The viewer was resolved by `load_viewer`; infallible.
        let viewer = Viewer::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        match viewer.user {
            Some(user) => Ok(AuthUser(user)),
            None => {
                tracing::debug!(path = %parts.uri.path(), "anonymous request to a login-only route");
                Err(flash_redirect(
                    &SessionManager::from_ref(state),
                    LOGIN_REQUIRED_MESSAGE,
                    "/login",
                ))
            }
        }
    }
}

/// AdminUser
///
/// The administrator (user id 1). Requires `AuthUser` first, so anonymous
/// requests are still sent to the login page; any other account gets a 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            tracing::warn!(user_id = user.id, path = %parts.uri.path(), "non-admin denied");
            return Err(AppError::Forbidden.into_response());
        }
        Ok(AdminUser(user))
    }
}

/// require_login
///
/// Guard layer: the request only continues when a user is logged in.
pub async fn require_login(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// Guard layer: the request only continues for the administrator. Layered
/// after `require_login`, so the checks run in order and stop at the first
/// failure.
pub async fn require_admin(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}
