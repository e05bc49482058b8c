use super::cookie;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// Owner of the client-visible session token.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Current token, if one is stored and not expired.
    fn token(&self) -> Option<SecretString>;
    fn set_token(&self, token: &SecretString);
    fn clear_token(&self);
    /// Clear the token only if it is still `expected`. Returns whether it did.
    fn clear_token_if(&self, expected: &SecretString) -> bool;
}

#[derive(Default)]
struct Jar {
    token: Option<SecretString>,
    /// `None` when the browser owns the expiry (token seeded from a request).
    expires_at: Option<Instant>,
    set_cookies: Vec<String>,
}

/// In-memory cookie jar holding the `auth_token` cookie.
///
/// Every write is also recorded as a `Set-Cookie` value so a server response
/// can replay it to the browser.
#[derive(Default)]
pub struct CookieJarStore {
    secure: bool,
    jar: Mutex<Jar>,
}

impl fmt::Debug for CookieJarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJarStore")
            .field("secure", &self.secure)
            .field("has_token", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl CookieJarStore {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self {
            secure,
            jar: Mutex::default(),
        }
    }

    /// Seed the jar from an incoming request's `Cookie` header.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
        let store = Self::new(secure);
        store.lock().token = cookie::token_from_headers(headers);
        store
    }

    /// Drain the `Set-Cookie` values written since the last call.
    pub fn take_set_cookies(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().set_cookies)
    }

    /// Store `token` with an explicit lifetime; a zero `max_age` deletes it.
    pub fn set_token_for(&self, token: &SecretString, max_age: Duration) {
        let mut jar = self.lock();
        if max_age.is_zero() {
            jar.token = None;
            jar.expires_at = None;
        } else {
            jar.token = Some(token.clone());
            jar.expires_at = Instant::now().checked_add(max_age);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Jar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for CookieJarStore {
    fn token(&self) -> Option<SecretString> {
        let mut jar = self.lock();
        if jar
            .expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
        {
            jar.token = None;
            jar.expires_at = None;
        }
        jar.token.clone()
    }

    fn set_token(&self, token: &SecretString) {
        self.set_token_for(token, Duration::from_secs(cookie::MAX_AGE_SECONDS.unsigned_abs()));
        self.lock()
            .set_cookies
            .push(cookie::set_cookie(token, self.secure));
    }

    fn clear_token(&self) {
        let mut jar = self.lock();
        jar.token = None;
        jar.expires_at = None;
        jar.set_cookies.push(cookie::clear_cookie(self.secure));
    }

    fn clear_token_if(&self, expected: &SecretString) -> bool {
        let mut jar = self.lock();
        let matches = jar
            .token
            .as_ref()
            .is_some_and(|token| token.expose_secret() == expected.expose_secret());
        if matches {
            jar.token = None;
            jar.expires_at = None;
            jar.set_cookies.push(cookie::clear_cookie(self.secure));
        }
        matches
    }
}
