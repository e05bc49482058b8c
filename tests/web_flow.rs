use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use reviewtap::{client::ApiConfig, web};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const FORM: &str = "application/x-www-form-urlencoded";

fn app(server: &MockServer) -> Result<Router> {
    let api = ApiConfig::new(server.uri(), Duration::from_secs(5))?;
    Ok(web::router(web::AppState::new(api, false)))
}

fn user_json() -> Value {
    json!({
        "id": "1",
        "email": "a@b.com",
        "name": "Ada",
        "role": "customer",
        "language": "en",
        "emailVerifiedAt": null,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn dashboard_without_cookie_redirects_to_login() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(Request::get("/en/dashboard/devices").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response).as_deref(),
        Some("/en/login?redirect=%2Fen%2Fdashboard%2Fdevices")
    );
    Ok(())
}

#[tokio::test]
async fn login_page_with_cookie_redirects_to_dashboard() -> Result<()> {
    let server = MockServer::start().await;

    let response = app(&server)?
        .oneshot(
            Request::get("/nb/login")
                .header(COOKIE, "auth_token=tok_abc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response).as_deref(), Some("/nb/dashboard"));
    Ok(())
}

#[tokio::test]
async fn login_sets_cookie_and_follows_redirect() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user": user_json(), "token": "tok_abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::post("/en/login?redirect=%2Fen%2Fdashboard%2Fdevices")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("email=a%40b.com&password=secret123"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/en/dashboard/devices"));
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("auth_token=tok_abc;"));
    assert!(cookies[0].contains("Max-Age=2592000"));
    Ok(())
}

#[tokio::test]
async fn rejected_login_rerenders_form_without_cookie() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "These credentials do not match our records.",
            "errors": {"email": ["These credentials do not match our records."]}
        })))
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::post("/en/login")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("email=a%40b.com&password=wrongpass"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(set_cookies(&response).is_empty());
    let body = body_text(response).await?;
    assert!(body.contains("These credentials do not match our records."));
    Ok(())
}

#[tokio::test]
async fn register_mismatch_never_reaches_backend() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::post("/en/register")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from(
                    "name=Ada&email=a%40b.com&password=secret123&password_confirmation=secret124",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await?;
    assert!(body.contains("Passwords do not match."));
    assert!(body.contains(r#"id="password_confirmation" name="password_confirmation" type="password" value="" aria-invalid="true""#));
    Ok(())
}

#[tokio::test]
async fn forgot_password_succeeds_even_when_backend_fails() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "We can't find a user with that email address."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::post("/en/forgot-password")
                .header(CONTENT_TYPE, FORM)
                .body(Body::from("email=nobody%40b.com"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await?;
    assert!(body.contains("Check your email"));
    assert!(!body.contains("find a user"));
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie_even_when_backend_fails() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::post("/en/logout")
                .header(COOKIE, "auth_token=tok_abc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/"));
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("auth_token=;"));
    assert!(cookies[0].contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn dashboard_with_rejected_token_clears_cookie() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthenticated."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::get("/en/dashboard")
                .header(COOKIE, "auth_token=tok_revoked")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response).as_deref(),
        Some("/en/login?redirect=%2Fen%2Fdashboard")
    );
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn dashboard_renders_for_confirmed_user() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": user_json()})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/businesses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "meta": {"currentPage": 1, "lastPage": 1, "perPage": 15, "total": 0}
        })))
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(
            Request::get("/en/dashboard")
                .header(COOKIE, "auth_token=tok_abc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    let body = body_text(response).await?;
    assert!(body.contains("Welcome back, Ada."));
    assert!(body.contains("You have not set up a business yet."));
    Ok(())
}

#[tokio::test]
async fn unprefixed_path_is_sent_to_negotiated_locale() -> Result<()> {
    let server = MockServer::start().await;

    let response = app(&server)?
        .oneshot(
            Request::get("/pricing?plan=pro")
                .header("accept-language", "nb-NO,nb;q=0.9,en;q=0.8")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response).as_deref(), Some("/nb/pricing?plan=pro"));
    Ok(())
}

#[tokio::test]
async fn unknown_page_under_locale_is_not_found() -> Result<()> {
    let server = MockServer::start().await;

    let response = app(&server)?
        .oneshot(Request::get("/en/no/such/page").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
