//! Route protection for page navigations.
//!
//! The guard only checks whether a session cookie is present. It is a cheap
//! gate in front of the pages; protected pages still confirm the user with
//! the backend before rendering anything sensitive.

mod middleware;

pub use middleware::route_guard;

use crate::locale::{strip_locale, Locale};
use url::form_urlencoded::byte_serialize;

pub const PROTECTED_PREFIX: &str = "/dashboard";
pub const AUTH_PAGES: [&str; 3] = ["/login", "/register", "/forgot-password"];

/// Path prefixes the guard never looks at.
const UNGUARDED_PREFIXES: [&str; 3] = ["/api", "/assets", "/health"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Protected page without a session cookie.
    ProtectedRedirect { location: String },
    /// Auth page while a session cookie is present.
    AuthRedirect { location: String },
    PassThrough,
}

impl GuardDecision {
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::ProtectedRedirect { location } | Self::AuthRedirect { location } => {
                Some(location)
            }
            Self::PassThrough => None,
        }
    }
}

/// `true` when `path` equals `prefix` or continues it with a `/`.
fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn is_protected(canonical: &str) -> bool {
    has_segment_prefix(canonical, PROTECTED_PREFIX)
}

#[must_use]
pub fn is_auth_page(canonical: &str) -> bool {
    AUTH_PAGES
        .iter()
        .any(|page| has_segment_prefix(canonical, page))
}

/// Whether the guard applies to `path` at all: API, asset and health paths
/// and anything that looks like a file are skipped.
#[must_use]
pub fn is_guarded(path: &str) -> bool {
    !path.contains('.')
        && !UNGUARDED_PREFIXES
            .iter()
            .any(|prefix| has_segment_prefix(path, prefix))
}

/// Decide what to do with a navigation to `path`.
#[must_use]
pub fn evaluate(path: &str, has_token: bool) -> GuardDecision {
    let locale = Locale::detect(path);
    let canonical = strip_locale(path);

    if is_protected(canonical) && !has_token {
        let redirect: String = byte_serialize(path.as_bytes()).collect();
        return GuardDecision::ProtectedRedirect {
            location: format!("/{locale}/login?redirect={redirect}"),
        };
    }

    if is_auth_page(canonical) && has_token {
        return GuardDecision::AuthRedirect {
            location: format!("/{locale}{PROTECTED_PREFIX}"),
        };
    }

    GuardDecision::PassThrough
}

/// Locale routing: a path without a locale prefix is sent to the same path
/// under the negotiated locale. Locale-prefixed paths are left alone.
#[must_use]
pub fn locale_redirect(
    path: &str,
    query: Option<&str>,
    accept_language: Option<&str>,
) -> Option<String> {
    if Locale::from_path(path).is_some() {
        return None;
    }

    let locale = Locale::negotiate(accept_language);
    let rest = if path == "/" { "" } else { path };
    let mut location = format!("/{locale}{rest}");
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        location.push('?');
        location.push_str(query);
    }
    Some(location)
}
