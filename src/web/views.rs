//! Minimal HTML shells. Markup is kept to what the flows need: navigation,
//! forms with inline errors and plain lists of backend data.

use crate::{
    client::{types::User, FieldErrors},
    locale::Locale,
};
use axum::response::Html;
use std::fmt::Write as _;

#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Full page with the site navigation.
#[must_use]
pub fn layout(locale: Locale, title: &str, user: Option<&User>, body: &str) -> Html<String> {
    let mut nav = format!(
        r#"<a href="/{locale}">Home</a> <a href="/{locale}/products">Products</a> <a href="/{locale}/pricing">Pricing</a>"#
    );
    match user {
        Some(user) => {
            let _ = write!(
                nav,
                r#" <a href="/{locale}/dashboard">Dashboard</a> <span>{}</span> <form method="post" action="/{locale}/logout"><button type="submit">Log out</button></form>"#,
                escape(&user.name)
            );
        }
        None => {
            let _ = write!(
                nav,
                r#" <a href="/{locale}/login">Log in</a> <a href="/{locale}/register">Get started</a>"#
            );
        }
    }
    for other in Locale::ALL.into_iter().filter(|other| *other != locale) {
        let _ = write!(nav, r#" <a href="/{other}" hreflang="{other}">{other}</a>"#);
    }

    Html(format!(
        r#"<!doctype html>
<html lang="{locale}">
<head><meta charset="utf-8"><title>{title} | Reviewtap</title></head>
<body>
<nav>{nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

/// Top-level error banner shown above a form.
#[must_use]
pub fn alert(message: Option<&str>) -> String {
    message.map_or_else(String::new, |message| {
        format!(r#"<div role="alert" class="error">{}</div>"#, escape(message))
    })
}

/// One labelled input with its first field error, if any.
#[must_use]
pub fn field(name: &str, label: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    let error = errors
        .get(name)
        .and_then(|messages| messages.first())
        .map_or_else(String::new, |message| {
            format!(r#"<p class="field-error">{}</p>"#, escape(message))
        });
    let invalid = if errors.contains_key(name) {
        r#" aria-invalid="true""#
    } else {
        ""
    };
    format!(
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" value="{}"{invalid}>{error}"#,
        escape(value)
    )
}

/// `<ul>` of pre-rendered, already escaped items, or `empty` when there are none.
#[must_use]
pub fn list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return format!("<p>{}</p>", escape(empty));
    }
    let mut html = String::from("<ul>");
    for item in items {
        let _ = write!(html, "<li>{item}</li>");
    }
    html.push_str("</ul>");
    html
}

/// Minor currency units as `123.45 NOK`.
#[must_use]
pub fn price(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{sign}{}.{:02} {}",
        cents / 100,
        cents % 100,
        escape(&currency.to_uppercase())
    )
}
