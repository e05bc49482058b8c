use super::AppState;
use crate::{
    auth::AuthService,
    locale::Locale,
    session::{CookieJarStore, SessionContext},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, warn};

/// Session for a single request.
///
/// The cookie jar is seeded from the request's `Cookie` header; whatever the
/// auth operations write to it is replayed as `Set-Cookie` by
/// [`RequestSession::respond`].
#[derive(Debug)]
pub struct RequestSession {
    store: Arc<CookieJarStore>,
    auth: AuthService,
    locale: Locale,
}

impl RequestSession {
    #[must_use]
    pub fn new(state: &AppState, headers: &axum::http::HeaderMap, locale: Locale) -> Self {
        let store = Arc::new(CookieJarStore::from_headers(headers, state.cookie_secure));
        let context = SessionContext::new(state.api.clone(), store.clone(), locale);
        Self {
            store,
            auth: AuthService::new(Arc::new(context)),
            locale,
        }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Attach pending cookie writes to `response`.
    pub fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        for cookie in self.store.take_set_cookies() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => warn!("Dropping unrepresentable Set-Cookie header: {err}"),
            }
        }
        response
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<AppState>() else {
            error!("AppState extension is not installed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        };
        let locale = Locale::detect(parts.uri.path());
        Ok(Self::new(state, &parts.headers, locale))
    }
}
