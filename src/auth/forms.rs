//! Auth form input and its client-side validation.
//!
//! Validation runs before any network call and reports problems in the same
//! field-keyed shape the backend uses, so callers render both alike.

use crate::{
    client::{
        types::{ForgotPasswordPayload, LoginPayload, RegisterPayload},
        FieldErrors,
    },
    locale::Locale,
};
use regex::Regex;
use serde::Deserialize;
use std::fmt;

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn finish(errors: FieldErrors) -> Result<(), FieldErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !valid_email(email.trim()) {
        push(errors, "email", "Please enter a valid email address.");
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    /// # Errors
    /// Returns the per-field messages when the input is malformed.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            push(&mut errors, "password", "Please enter your password.");
        }
        finish(errors)
    }

    #[must_use]
    pub fn into_payload(self) -> LoginPayload {
        LoginPayload {
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl RegisterForm {
    /// # Errors
    /// Returns the per-field messages when the input is malformed; a
    /// mismatched confirmation is reported on `password_confirmation`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            push(&mut errors, "name", "Please enter your name.");
        }
        check_email(&mut errors, &self.email);

        let too_short = format!("Must be at least {MIN_PASSWORD_LENGTH} characters.");
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            push(&mut errors, "password", too_short.as_str());
        }
        if self.password_confirmation.chars().count() < MIN_PASSWORD_LENGTH {
            push(&mut errors, "password_confirmation", too_short.as_str());
        }
        if self.password != self.password_confirmation {
            push(&mut errors, "password_confirmation", "Passwords do not match.");
        }

        finish(errors)
    }

    /// Payload for the backend, tagged with the visitor's locale.
    #[must_use]
    pub fn into_payload(self, locale: Locale) -> RegisterPayload {
        RegisterPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            password_confirmation: self.password_confirmation,
            language: Some(locale.as_str().to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

impl ForgotPasswordForm {
    /// # Errors
    /// Returns the per-field messages when the email is malformed.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        finish(errors)
    }

    #[must_use]
    pub fn into_payload(self) -> ForgotPasswordPayload {
        ForgotPasswordPayload {
            email: self.email.trim().to_string(),
        }
    }
}
