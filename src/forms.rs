use serde::Deserialize;
use std::{borrow::Cow, collections::BTreeMap};
use validator::{Validate, ValidateUrl, ValidationError, ValidationErrors};

const REQUIRED: &str = "required";

/// Rejects empty and whitespace-only input.
fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(REQUIRED).with_message(Cow::Borrowed("This field is required.")));
    }
    Ok(())
}

/// Accepts absolute `http`/`https` URLs whose host ends in an alphabetic
/// top-level domain, e.g. `https://images.example.com/cover.jpg`.
fn web_url(value: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::new("url").with_message(Cow::Borrowed("Invalid URL."));

    let lower = value.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(invalid)?;

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();

    let has_tld = host.rsplit_once('.').is_some_and(|(name, tld)| {
        !name.is_empty() && !name.ends_with('.') && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
    });

    if !has_tld || !value.validate_url() {
        return Err(invalid());
    }
    Ok(())
}

fn required_web_url(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    web_url(value)
}

// --- Input Schemas ---
//
// Every field defaults to empty so a missing field shows up as a validation
// error on the re-rendered page instead of an extractor rejection.

/// CreatePostForm
///
/// Used for both `/new-post` and `/edit_post/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreatePostForm {
    #[validate(custom(function = "required"))]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub subtitle: String,
    #[validate(custom(function = "required_web_url"))]
    pub img_url: String,
    #[validate(custom(function = "required"))]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(custom(function = "required"), email(message = "Invalid email address."))]
    pub email: String,
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "Field cannot be longer than 100 characters.")
    )]
    pub password: String,
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "Field cannot be longer than 100 characters.")
    )]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom(function = "required"), email(message = "Invalid email address."))]
    pub email: String,
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "Field cannot be longer than 100 characters.")
    )]
    pub password: String,
}

/// CommentForm
///
/// `comment` carries rich text from the editor widget.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(custom(function = "required"))]
    pub comment: String,
}

/// FormErrors
///
/// Field name to the messages shown next to that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Attaches a single error to `field`.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

impl From<ValidationErrors> for FormErrors {
    /// A failed `required` check stops the chain for that field: only its
    /// message is kept.
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::default();
        for (field, errs) in errors.field_errors() {
            let field = field.to_string();
            let missing = errs.iter().any(|e| e.code == REQUIRED);
            for err in errs.iter().filter(|e| !missing || e.code == REQUIRED) {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", err.code));
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// Runs the form's validators, collecting failures per field.
pub fn check<T: Validate>(form: &T) -> Result<(), FormErrors> {
    form.validate().map_err(FormErrors::from)
}
