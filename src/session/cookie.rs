//! The `auth_token` cookie: attribute formatting and request-header parsing.

use axum::http::{header::COOKIE, HeaderMap};
use secrecy::{ExposeSecret, SecretString};

pub const COOKIE_NAME: &str = "auth_token";
pub const COOKIE_PATH: &str = "/";
/// 30 days.
pub const MAX_AGE_SECONDS: i64 = 2_592_000;

/// `Set-Cookie` value storing `token` for the whole site.
#[must_use]
pub fn set_cookie(token: &SecretString, secure: bool) -> String {
    let mut cookie = format!(
        "{COOKIE_NAME}={}; Path={COOKIE_PATH}; Max-Age={MAX_AGE_SECONDS}; SameSite=Lax",
        token.expose_secret()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the token immediately.
#[must_use]
pub fn clear_cookie(secure: bool) -> String {
    let mut cookie = format!("{COOKIE_NAME}=; Path={COOKIE_PATH}; Max-Age=0; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Token from the request `Cookie` header(s); an empty value counts as absent.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<SecretString> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name != COOKIE_NAME {
                return None;
            }
            let value = value.trim();
            (!value.is_empty()).then(|| SecretString::from(value.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn set_cookie_has_session_attributes() {
        let cookie = set_cookie(&SecretString::from("tok_abc"), false);
        assert_eq!(
            cookie,
            "auth_token=tok_abc; Path=/; Max-Age=2592000; SameSite=Lax"
        );
        assert!(set_cookie(&SecretString::from("t"), true).ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert_eq!(
            clear_cookie(false),
            "auth_token=; Path=/; Max-Age=0; SameSite=Lax"
        );
    }

    #[test]
    fn token_from_headers_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; auth_token=tok_abc; other=1"),
        );
        let token = token_from_headers(&headers);
        assert_eq!(token.as_ref().map(|t| t.expose_secret()), Some("tok_abc"));
    }

    #[test]
    fn token_from_headers_ignores_empty_and_similar_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("auth_token_old=x; auth_token="),
        );
        assert!(token_from_headers(&headers).is_none());
        assert!(token_from_headers(&HeaderMap::new()).is_none());
    }
}
