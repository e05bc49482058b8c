//! Login, register, forgot-password and logout form handlers.

use super::locale_param;
use crate::{
    auth::{AuthError, ForgotPasswordForm, LoginForm, RegisterForm},
    client::FieldErrors,
    locale::Locale,
    web::{session::RequestSession, views},
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    redirect: Option<String>,
}

/// Same-site path to continue to after login; anything else is ignored.
fn safe_redirect(target: Option<&str>) -> Option<&str> {
    target.filter(|target| {
        target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
    })
}

fn dashboard(locale: Locale) -> String {
    format!("/{locale}/dashboard")
}

#[derive(Default)]
struct FormView<'a> {
    message: Option<&'a str>,
    errors: FieldErrors,
}

impl<'a> FormView<'a> {
    fn invalid(errors: FieldErrors) -> Self {
        Self {
            message: None,
            errors,
        }
    }

    /// Backend failures show their message on top and any field errors inline.
    fn failed(err: &'a AuthError) -> Self {
        match err.api() {
            Some(api) => Self {
                message: Some(api.message.as_str()),
                errors: api.errors.clone().unwrap_or_default(),
            },
            None => Self {
                message: Some("Please try again."),
                errors: FieldErrors::new(),
            },
        }
    }
}

fn login_page(locale: Locale, redirect: Option<&str>, email: &str, view: &FormView) -> Response {
    let action = match safe_redirect(redirect) {
        Some(target) => format!(
            "/{locale}/login?redirect={}",
            byte_serialize(target.as_bytes()).collect::<String>()
        ),
        None => format!("/{locale}/login"),
    };
    let body = format!(
        r#"{}<form method="post" action="{}">{}{}<button type="submit">Log in</button></form>
<p><a href="/{locale}/forgot-password">Forgot your password?</a></p>
<p><a href="/{locale}/register">Create an account</a></p>"#,
        views::alert(view.message),
        views::escape(&action),
        views::field("email", "Email", "email", email, &view.errors),
        views::field("password", "Password", "password", "", &view.errors),
    );
    views::layout(locale, "Log in", None, &body).into_response()
}

fn register_page(locale: Locale, form: &RegisterForm, view: &FormView) -> Response {
    let body = format!(
        r#"{}<form method="post" action="/{locale}/register">{}{}{}{}<button type="submit">Create account</button></form>
<p><a href="/{locale}/login">Already have an account?</a></p>"#,
        views::alert(view.message),
        views::field("name", "Name", "text", &form.name, &view.errors),
        views::field("email", "Email", "email", &form.email, &view.errors),
        views::field("password", "Password", "password", "", &view.errors),
        views::field(
            "password_confirmation",
            "Confirm password",
            "password",
            "",
            &view.errors
        ),
    );
    views::layout(locale, "Create account", None, &body).into_response()
}

fn forgot_page(locale: Locale, email: &str, view: &FormView) -> Response {
    let body = format!(
        r#"<p>Enter your email and we will send you a reset link.</p><form method="post" action="/{locale}/forgot-password">{}<button type="submit">Send reset link</button></form>
<p><a href="/{locale}/login">Back to login</a></p>"#,
        views::field("email", "Email", "email", email, &view.errors),
    );
    views::layout(locale, "Forgot password", None, &body).into_response()
}

pub async fn login_form(
    Path(locale): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    match locale_param(&locale) {
        Ok(locale) => login_page(locale, query.redirect.as_deref(), "", &FormView::default()),
        Err(response) => response,
    }
}

pub async fn login(
    Path(locale): Path<String>,
    Query(query): Query<RedirectQuery>,
    session: RequestSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let redirect = query.redirect.as_deref();

    if let Err(errors) = form.validate() {
        let page = login_page(locale, redirect, &form.email, &FormView::invalid(errors));
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let payload = form.into_payload();
    match session.auth().login(&payload.email, &payload.password).await {
        Ok(_) => {
            let target = safe_redirect(redirect).map_or_else(|| dashboard(locale), str::to_string);
            session.respond(Redirect::to(&target))
        }
        Err(err) => {
            debug!("Login rejected: {err}");
            let page = login_page(locale, redirect, &payload.email, &FormView::failed(&err));
            session.respond((StatusCode::UNPROCESSABLE_ENTITY, page))
        }
    }
}

pub async fn register_form(Path(locale): Path<String>) -> Response {
    match locale_param(&locale) {
        Ok(locale) => register_page(locale, &RegisterForm::default(), &FormView::default()),
        Err(response) => response,
    }
}

pub async fn register(
    Path(locale): Path<String>,
    session: RequestSession,
    Form(form): Form<RegisterForm>,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };

    if let Err(errors) = form.validate() {
        let page = register_page(locale, &form, &FormView::invalid(errors));
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    match session
        .auth()
        .register(form.clone().into_payload(locale))
        .await
    {
        Ok(_) => session.respond(Redirect::to(&dashboard(locale))),
        Err(err) => {
            debug!("Registration rejected: {err}");
            let page = register_page(locale, &form, &FormView::failed(&err));
            session.respond((StatusCode::UNPROCESSABLE_ENTITY, page))
        }
    }
}

pub async fn forgot_password_form(Path(locale): Path<String>) -> Response {
    match locale_param(&locale) {
        Ok(locale) => forgot_page(locale, "", &FormView::default()),
        Err(response) => response,
    }
}

/// Valid input always ends on the "check your email" page, whatever the
/// backend answered.
pub async fn forgot_password(
    Path(locale): Path<String>,
    session: RequestSession,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };

    if let Err(errors) = form.validate() {
        let page = forgot_page(locale, &form.email, &FormView::invalid(errors));
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let payload = form.into_payload();
    session.auth().forgot_password(&payload.email).await;

    let body = format!(
        r#"<p>If an account exists for that address, we have sent a link to reset your password.</p>
<p><a href="/{locale}/login">Back to login</a></p>"#
    );
    session.respond(views::layout(locale, "Check your email", None, &body))
}

pub async fn logout(Path(locale): Path<String>, session: RequestSession) -> Response {
    if let Err(response) = locale_param(&locale) {
        return response;
    }

    match session.auth().logout().await {
        Ok(outcome) => session.respond(Redirect::to(outcome.redirect_to)),
        Err(err) => {
            debug!("Logout did not commit: {err}");
            session.respond(Redirect::to(crate::auth::LOGOUT_REDIRECT))
        }
    }
}
