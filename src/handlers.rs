use axum::{
    Form,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use chrono::Local;

use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, AppResult},
    forms::{self, CommentForm, CreatePostForm, FormErrors, LoginForm, RegisterForm},
    models::{NewPost, NewUser, PostChanges},
    repository::RepoError,
    session::{Viewer, flash_redirect},
    views,
};

pub const ACCOUNT_EXISTS_MESSAGE: &str = "An account already exists with that email. Try to Login instead";
pub const EMAIL_NOT_FOUND_MESSAGE: &str = "That email does not exist";
pub const WRONG_PASSWORD_MESSAGE: &str = "Password is incorrect";
pub const LOGIN_TO_COMMENT_MESSAGE: &str = "You need to login in order to comment";
pub const DUPLICATE_TITLE_MESSAGE: &str = "A post with that title already exists.";

/// Display format of a post's date, e.g. "October 18, 2026".
const POST_DATE_FORMAT: &str = "%B %d, %Y";

/// PostId
///
/// The `{id}` path segment of a post route. Anything that is not an `i64`
/// names no post, so it is answered with the 404 page like an unknown id.
#[derive(Debug, Clone, Copy)]
pub struct PostId(pub i64);

impl<S> FromRequestParts<S> for PostId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, "unparseable post id");
                AppError::NotFound
            })?;
        Ok(PostId(id))
    }
}

// --- Reading ---

/// get_all_posts
///
/// [Public Route] The home page: every post, oldest first.
pub async fn get_all_posts(viewer: Viewer, State(state): State<AppState>) -> AppResult<Html<String>> {
    let posts = state.repo.get_all_posts().await?;
    Ok(Html(views::index(&viewer, &posts)))
}

/// show_post
///
/// [Public Route] A single post with its comments and the comment form.
/// An unknown id renders the 404 page.
pub async fn show_post(
    viewer: Viewer,
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> AppResult<Html<String>> {
    let post = state.repo.get_post(post_id).await?;
    let comments = state.repo.get_comments(post_id).await?;
    Ok(Html(views::post(
        &viewer,
        &post,
        &comments,
        &CommentForm::default(),
        &FormErrors::default(),
    )))
}

/// add_comment
///
/// [Public Route, login checked here] Accepts the comment form on a post page.
/// Anonymous visitors are sent to the login page with a flash message; invalid
/// input re-renders the post. A stored comment redirects back to the post.
pub async fn add_comment(
    viewer: Viewer,
    State(state): State<AppState>,
    PostId(post_id): PostId,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post = state.repo.get_post(post_id).await?;

    let Some(user) = viewer.user.as_ref() else {
        return Ok(flash_redirect(&state.sessions, LOGIN_TO_COMMENT_MESSAGE, "/login"));
    };

    if let Err(errors) = forms::check(&form) {
        let comments = state.repo.get_comments(post_id).await?;
        return Ok(Html(views::post(&viewer, &post, &comments, &form, &errors)).into_response());
    }

    let comment = state.repo.add_comment(post.id, user.id, form.comment).await?;
    tracing::info!(comment_id = comment.id, post_id, author_id = user.id, "comment added");

    Ok(Redirect::to(&format!("/post/{post_id}")).into_response())
}

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn about(viewer: Viewer) -> Html<String> {
    Html(views::about(&viewer))
}

pub async fn contact(viewer: Viewer) -> Html<String> {
    Html(views::contact(&viewer))
}

// --- Accounts ---

pub async fn register_form(viewer: Viewer) -> Html<String> {
    Html(views::register(&viewer, &RegisterForm::default(), &FormErrors::default()))
}

/// register
///
/// [Public Route] Creates an account and logs it in straight away.
///
/// A known email is turned away before hashing anything. The UNIQUE constraint
/// still has the last word: if a concurrent registration wins the race, the
/// resulting `Conflict` gets the same message as the pre-check.
pub async fn register(
    viewer: Viewer,
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if let Err(errors) = forms::check(&form) {
        return Ok(Html(views::register(&viewer, &form, &errors)).into_response());
    }

    match state.repo.find_user_by_email(&form.email).await {
        Ok(_) => {
            tracing::info!("registration refused: email already on file");
            return Ok(flash_redirect(&state.sessions, ACCOUNT_EXISTS_MESSAGE, "/login"));
        }
        Err(RepoError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let new_user = NewUser {
        email: form.email,
        password_hash: state.passwords.hash(&form.password)?,
        name: form.name,
    };

    let user = match state.repo.create_user(new_user).await {
        Ok(user) => user,
        Err(RepoError::Conflict(_)) => {
            tracing::info!("registration lost a race on the email constraint");
            return Ok(flash_redirect(&state.sessions, ACCOUNT_EXISTS_MESSAGE, "/login"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, "user registered");
    let cookie = state.sessions.login_cookie(user.id)?;
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}

pub async fn login_form(viewer: Viewer) -> Html<String> {
    Html(views::login(&viewer, &LoginForm::default(), &FormErrors::default()))
}

/// login
///
/// [Public Route] Starts a session. An unknown email and a wrong password get
/// distinct messages, and neither sets the session cookie.
pub async fn login(
    viewer: Viewer,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if let Err(errors) = forms::check(&form) {
        return Ok(Html(views::login(&viewer, &form, &errors)).into_response());
    }

    let user = match state.repo.find_user_by_email(&form.email).await {
        Ok(user) => user,
        Err(RepoError::NotFound) => {
            tracing::info!("login failed: unknown email");
            return Ok(flash_redirect(&state.sessions, EMAIL_NOT_FOUND_MESSAGE, "/login"));
        }
        Err(e) => return Err(e.into()),
    };

    if !state.passwords.verify(&form.password, &user.password)? {
        tracing::info!(user_id = user.id, "login failed: wrong password");
        return Ok(flash_redirect(&state.sessions, WRONG_PASSWORD_MESSAGE, "/login"));
    }

    tracing::info!(user_id = user.id, "user logged in");
    let cookie = state.sessions.login_cookie(user.id)?;
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}

/// logout
///
/// [Public Route] Ends the session, whether or not one exists.
pub async fn logout(viewer: Viewer, State(state): State<AppState>) -> Response {
    if let Some(user) = &viewer.user {
        tracing::info!(user_id = user.id, "user logged out");
    }
    (
        AppendHeaders([(header::SET_COOKIE, state.sessions.logout_cookie())]),
        Redirect::to("/"),
    )
        .into_response()
}

// --- Administration ---

pub async fn new_post_form(viewer: Viewer, _admin: AdminUser) -> Html<String> {
    Html(views::make_post(&viewer, &CreatePostForm::default(), &FormErrors::default(), None))
}

/// create_post
///
/// [Admin Route] Publishes a post authored by the administrator, dated today.
/// A title that is already taken re-renders the form with an error on `title`.
pub async fn create_post(
    viewer: Viewer,
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<CreatePostForm>,
) -> AppResult<Response> {
    if let Err(errors) = forms::check(&form) {
        return Ok(Html(views::make_post(&viewer, &form, &errors, None)).into_response());
    }

    let new_post = NewPost {
        title: form.title.clone(),
        subtitle: form.subtitle.clone(),
        date: Local::now().format(POST_DATE_FORMAT).to_string(),
        body: form.body.clone(),
        img_url: form.img_url.clone(),
        author_id: admin.id,
    };

    match state.repo.create_post(new_post).await {
        Ok(post) => {
            tracing::info!(post_id = post.id, "post created");
            Ok(Redirect::to("/").into_response())
        }
        Err(RepoError::Conflict(_)) => {
            let errors = FormErrors::single("title", DUPLICATE_TITLE_MESSAGE);
            Ok(Html(views::make_post(&viewer, &form, &errors, None)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// edit_post_form
///
/// [Admin Route] The post editor, prefilled with the post's current values.
pub async fn edit_post_form(
    viewer: Viewer,
    _admin: AdminUser,
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> AppResult<Html<String>> {
    let post = state.repo.get_post(post_id).await?;
    let form = CreatePostForm {
        title: post.title,
        subtitle: post.subtitle,
        img_url: post.img_url,
        body: post.body,
    };
    Ok(Html(views::make_post(&viewer, &form, &FormErrors::default(), Some(post_id))))
}

/// update_post
///
/// [Admin Route] Rewrites title, subtitle, body and image URL. Id, author and
/// date are left as they were.
pub async fn update_post(
    viewer: Viewer,
    _admin: AdminUser,
    State(state): State<AppState>,
    PostId(post_id): PostId,
    Form(form): Form<CreatePostForm>,
) -> AppResult<Response> {
    // 404 before validation, so a bad id never shows an editor.
    state.repo.get_post(post_id).await?;

    if let Err(errors) = forms::check(&form) {
        return Ok(Html(views::make_post(&viewer, &form, &errors, Some(post_id))).into_response());
    }

    let changes = PostChanges {
        title: form.title.clone(),
        subtitle: form.subtitle.clone(),
        body: form.body.clone(),
        img_url: form.img_url.clone(),
    };

    match state.repo.update_post(post_id, changes).await {
        Ok(post) => {
            tracing::info!(post_id = post.id, "post updated");
            Ok(Redirect::to("/").into_response())
        }
        Err(RepoError::Conflict(_)) => {
            let errors = FormErrors::single("title", DUPLICATE_TITLE_MESSAGE);
            Ok(Html(views::make_post(&viewer, &form, &errors, Some(post_id))).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// delete_post
///
/// [Admin Route] Removes a post together with its comments.
pub async fn delete_post(
    _admin: AdminUser,
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> Result<Redirect, AppError> {
    state.repo.delete_post(post_id).await?;
    tracing::info!(post_id, "post deleted");
    Ok(Redirect::to("/"))
}
