use super::{evaluate, is_guarded, locale_redirect, GuardDecision};
use crate::session::cookie;
use axum::{
    extract::Request,
    http::header::ACCEPT_LANGUAGE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

/// Guard every page navigation, then apply locale routing.
///
/// Redirects are temporary (307) so the browser retries the original method.
pub async fn route_guard(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_guarded(&path) {
        return next.run(request).await;
    }

    let has_token = cookie::token_from_headers(request.headers()).is_some();
    match evaluate(&path, has_token) {
        GuardDecision::ProtectedRedirect { location } => {
            debug!("No session cookie for {path}, redirecting to {location}");
            return Redirect::temporary(&location).into_response();
        }
        GuardDecision::AuthRedirect { location } => {
            debug!("Session cookie present on {path}, redirecting to {location}");
            return Redirect::temporary(&location).into_response();
        }
        GuardDecision::PassThrough => {}
    }

    let accept_language = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    if let Some(location) = locale_redirect(&path, request.uri().query(), accept_language) {
        return Redirect::temporary(&location).into_response();
    }

    next.run(request).await
}
