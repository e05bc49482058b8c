pub mod auth;
pub mod dashboard;
pub mod health;
pub mod pages;

use super::views;
use crate::locale::Locale;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Locale from a route parameter; unsupported locales are a 404.
pub(crate) fn locale_param(value: &str) -> Result<Locale, Response> {
    Locale::parse(value).ok_or_else(not_found)
}

pub(crate) fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html("<!doctype html><title>Not found</title><h1>Not found</h1>".to_string()),
    )
        .into_response()
}

/// Fallback for routes that do not exist.
pub async fn fallback() -> Response {
    not_found()
}

/// Inline notice for a backend read that failed.
pub(crate) fn unavailable(message: &str) -> String {
    format!(
        r#"<p role="alert" class="error">{}</p>"#,
        views::escape(message)
    )
}
