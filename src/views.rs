//! HTML pages.
//!
//! Rendered with `maud`, which escapes every interpolated value. Post bodies
//! and comments are rich text produced by the editor widget and are the only
//! values wrapped in `PreEscaped`.

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    forms::{CommentForm, CreatePostForm, FormErrors, LoginForm, RegisterForm},
    models::{Comment, Post},
    session::Viewer,
};

fn layout(viewer: &Viewer, title: &str, content: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                nav {
                    a href="/" { "Home" } " "
                    a href="/about" { "About" } " "
                    a href="/contact" { "Contact" }
                    @match &viewer.user {
                        Some(user) => {
                            @if user.is_admin() {
                                " " a href="/new-post" { "Create New Post" }
                            }
                            " " span class="user" { (user.name) }
                            " " a href="/logout" { "Log Out" }
                        }
                        None => {
                            " " a href="/login" { "Login" }
                            " " a href="/register" { "Register" }
                        }
                    }
                }
                @for message in &viewer.flashes {
                    p class="flash" { (message) }
                }
                main { (content) }
            }
        }
    }
    .into_string()
}

fn field_errors(errors: &FormErrors, name: &str) -> Markup {
    html! {
        @for message in errors.field(name) {
            " " span class="error" { (message) }
        }
    }
}

fn input(label: &str, name: &str, kind: &str, value: &str, errors: &FormErrors) -> Markup {
    html! {
        p {
            label for=(name) { (label) } " "
            input id=(name) name=(name) type=(kind) value=(value);
            (field_errors(errors, name))
        }
    }
}

fn textarea(label: &str, name: &str, value: &str, errors: &FormErrors) -> Markup {
    html! {
        p {
            label for=(name) { (label) } " "
            textarea id=(name) name=(name) class="rich-text" { (value) }
            (field_errors(errors, name))
        }
    }
}

fn byline(author: Option<&str>, date: &str) -> Markup {
    html! {
        p class="meta" { "Posted by " (author.unwrap_or("unknown")) " on " (date) }
    }
}

pub fn index(viewer: &Viewer, posts: &[Post]) -> String {
    let content = html! {
        h1 { "Blog" }
        @for post in posts {
            article class="post-preview" {
                a href={ "/post/" (post.id) } {
                    h2 { (post.title) }
                    h3 { (post.subtitle) }
                }
                (byline(post.author_name.as_deref(), &post.date))
                @if viewer.is_admin() {
                    a href={ "/delete/" (post.id) } { "✘" }
                }
            }
        }
        @if viewer.is_admin() {
            a href="/new-post" { "Create New Post" }
        }
    };
    layout(viewer, "Blog", content)
}

pub fn post(
    viewer: &Viewer,
    post: &Post,
    comments: &[Comment],
    form: &CommentForm,
    errors: &FormErrors,
) -> String {
    let content = html! {
        header {
            img class="post-image" src=(post.img_url) alt=(post.title);
            h1 { (post.title) }
            h2 { (post.subtitle) }
            (byline(post.author_name.as_deref(), &post.date))
        }
        article { (PreEscaped(&post.body)) }
        @if viewer.is_admin() {
            a href={ "/edit_post/" (post.id) } { "Edit Post" }
        }
        form method="post" action={ "/post/" (post.id) } {
            (textarea("Comment", "comment", &form.comment, errors))
            button type="submit" { "Submit Comment" }
        }
        ul class="comments" {
            @for comment in comments {
                li class="comment" {
                    (PreEscaped(&comment.text))
                    span class="author" { (comment.author_name.as_deref().unwrap_or("unknown")) }
                }
            }
        }
    };
    layout(viewer, &post.title, content)
}

/// The post editor. `editing` carries the id of the post being edited.
pub fn make_post(viewer: &Viewer, form: &CreatePostForm, errors: &FormErrors, editing: Option<i64>) -> String {
    let (heading, action) = match editing {
        Some(id) => ("Edit Post", format!("/edit_post/{id}")),
        None => ("New Post", "/new-post".to_string()),
    };
    let content = html! {
        h1 { (heading) }
        form method="post" action=(action) {
            (input("Blog Post Title", "title", "text", &form.title, errors))
            (input("Subtitle", "subtitle", "text", &form.subtitle, errors))
            (input("Blog Image URL", "img_url", "text", &form.img_url, errors))
            (textarea("Blog Content", "body", &form.body, errors))
            button type="submit" { "Submit Post" }
        }
    };
    layout(viewer, heading, content)
}

pub fn register(viewer: &Viewer, form: &RegisterForm, errors: &FormErrors) -> String {
    // Passwords are never echoed back.
    let content = html! {
        h1 { "Register" }
        form method="post" action="/register" {
            (input("Email", "email", "email", &form.email, errors))
            (input("Password", "password", "password", "", errors))
            (input("Name", "name", "text", &form.name, errors))
            button type="submit" { "register" }
        }
    };
    layout(viewer, "Register", content)
}

pub fn login(viewer: &Viewer, form: &LoginForm, errors: &FormErrors) -> String {
    let content = html! {
        h1 { "Log In" }
        form method="post" action="/login" {
            (input("Email", "email", "email", &form.email, errors))
            (input("Password", "password", "password", "", errors))
            button type="submit" { "login" }
        }
    };
    layout(viewer, "Log In", content)
}

pub fn about(viewer: &Viewer) -> String {
    let content = html! {
        h1 { "About Me" }
        p { "A personal blog about whatever is on my mind this week." }
    };
    layout(viewer, "About Me", content)
}

pub fn contact(viewer: &Viewer) -> String {
    let content = html! {
        h1 { "Contact Me" }
        p { "Have questions? Leave a comment on any post and I will get back to you." }
    };
    layout(viewer, "Contact Me", content)
}

/// Bare error page; never includes details of the failure.
pub fn error_page(code: u16, title: &str) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (code) " " (title) }
            }
            body {
                h1 { (code) " " (title) }
                p { a href="/" { "Back to the blog" } }
            }
        }
    }
    .into_string()
}
