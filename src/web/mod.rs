//! HTTP front end: storefront pages, auth forms and the dashboard.

mod handlers;
mod session;
mod state;
mod views;

pub use session::RequestSession;
pub use state::AppState;

use crate::guard::route_guard;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn,
    routing::{get, post},
    Extension, Router,
};
use handlers::{auth, dashboard, health, pages};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

/// Build the application router.
///
/// Unprefixed paths such as `/pricing` match `/:locale` or the fallback, so
/// the route guard sees them and redirects to the negotiated locale.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/:locale", get(pages::home))
        .route("/:locale/products", get(pages::products))
        .route("/:locale/products/:slug", get(pages::product))
        .route("/:locale/pricing", get(pages::pricing))
        .route("/:locale/login", get(auth::login_form).post(auth::login))
        .route(
            "/:locale/register",
            get(auth::register_form).post(auth::register),
        )
        .route(
            "/:locale/forgot-password",
            get(auth::forgot_password_form).post(auth::forgot_password),
        )
        .route("/:locale/logout", post(auth::logout))
        .route("/:locale/dashboard", get(dashboard::overview))
        .route("/:locale/dashboard/:section", get(dashboard::section))
        .fallback(handlers::fallback)
        .layer(from_fn(route_guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
