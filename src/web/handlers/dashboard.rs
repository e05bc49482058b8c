//! Business-owner dashboard.
//!
//! Every page confirms the user with the backend before rendering. The route
//! guard only checked that a cookie exists; a rejected token clears the
//! cookie here and sends the visitor back to login.

use super::{locale_param, not_found, unavailable};
use crate::{
    client::{
        types::{Business, Page},
        ApiError,
    },
    locale::Locale,
    session::QueryKey,
    web::{session::RequestSession, views},
};
use axum::{
    extract::Path,
    http::Uri,
    response::{Redirect, Response},
};
use url::form_urlencoded::byte_serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Analytics,
    Devices,
    Locations,
    Platforms,
    LandingPage,
    Orders,
    Subscription,
    Settings,
}

impl Section {
    pub const ALL: [Self; 8] = [
        Self::Analytics,
        Self::Devices,
        Self::Locations,
        Self::Platforms,
        Self::LandingPage,
        Self::Orders,
        Self::Subscription,
        Self::Settings,
    ];

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.slug() == value)
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Devices => "devices",
            Self::Locations => "locations",
            Self::Platforms => "platforms",
            Self::LandingPage => "landing-page",
            Self::Orders => "orders",
            Self::Subscription => "subscription",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Analytics => "Analytics",
            Self::Devices => "Devices",
            Self::Locations => "Locations",
            Self::Platforms => "Review platforms",
            Self::LandingPage => "Landing page",
            Self::Orders => "Orders",
            Self::Subscription => "Subscription",
            Self::Settings => "Settings",
        }
    }
}

fn sidebar(locale: Locale) -> String {
    let mut html = format!(r#"<aside><a href="/{locale}/dashboard">Overview</a>"#);
    for section in Section::ALL {
        html.push_str(&format!(
            r#" <a href="/{locale}/dashboard/{}">{}</a>"#,
            section.slug(),
            section.title()
        ));
    }
    html.push_str("</aside>");
    html
}

fn login_redirect(locale: Locale, uri: &Uri) -> Redirect {
    let original: String = byte_serialize(uri.path().as_bytes()).collect();
    Redirect::to(&format!("/{locale}/login?redirect={original}"))
}

/// Drop a token the backend would not confirm and send the visitor to login.
fn sign_in_again(session: &RequestSession, locale: Locale, uri: &Uri) -> Response {
    if session.auth().session().token_present() {
        session.auth().session().clear_token();
    }
    session.respond(login_redirect(locale, uri))
}

async fn primary_business(session: &RequestSession) -> Result<Option<Business>, ApiError> {
    let page: Page<Business> = session
        .auth()
        .session()
        .query(&QueryKey::new(["businesses"]), |client| async move {
            client.businesses().await
        })
        .await?;
    Ok(page.data.into_iter().next())
}

pub async fn overview(
    Path(locale): Path<String>,
    uri: Uri,
    session: RequestSession,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let Some(user) = session.auth().current_user().await else {
        return sign_in_again(&session, locale, &uri);
    };

    let business = match primary_business(&session).await {
        Ok(Some(business)) => format!(
            "<p>{}</p><p>{} devices, {} locations</p>",
            views::escape(&business.name),
            business.devices_count.unwrap_or_default(),
            business.locations_count.unwrap_or_default()
        ),
        Ok(None) => "<p>You have not set up a business yet.</p>".to_string(),
        Err(err) => unavailable(&err.message),
    };
    let body = format!(
        "{}<p>Welcome back, {}.</p>{business}",
        sidebar(locale),
        views::escape(&user.name)
    );
    session.respond(views::layout(locale, "Dashboard", Some(&user), &body))
}

pub async fn section(
    Path((locale, section)): Path<(String, String)>,
    uri: Uri,
    session: RequestSession,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let Some(section) = Section::parse(&section) else {
        return not_found();
    };
    let Some(user) = session.auth().current_user().await else {
        return sign_in_again(&session, locale, &uri);
    };

    let content = match render_section(&session, section, &user).await {
        Ok(content) => content,
        Err(err) => unavailable(&err.message),
    };
    let body = format!("{}{content}", sidebar(locale));
    session.respond(views::layout(locale, section.title(), Some(&user), &body))
}

async fn render_section(
    session: &RequestSession,
    section: Section,
    user: &crate::client::types::User,
) -> Result<String, ApiError> {
    let client = session.auth().session().client();

    match section {
        Section::Orders => {
            let items: Vec<String> = client
                .orders()
                .await?
                .iter()
                .map(|order| {
                    format!(
                        "#{} <span>{}</span> {}",
                        views::escape(&order.order_number),
                        views::escape(&order.status),
                        views::price(order.total_cents, &order.currency)
                    )
                })
                .collect();
            return Ok(views::list(&items, "No orders yet."));
        }
        Section::Subscription => {
            let items: Vec<String> = client
                .pricing_plans()
                .await?
                .iter()
                .filter(|plan| plan.is_active)
                .map(|plan| {
                    format!(
                        "{} <span>{}</span>",
                        views::escape(&plan.name),
                        views::price(plan.price_cents, &plan.currency)
                    )
                })
                .collect();
            return Ok(views::list(&items, "No plans available."));
        }
        Section::Settings => {
            return Ok(format!(
                "<dl><dt>Name</dt><dd>{}</dd><dt>Email</dt><dd>{}</dd><dt>Language</dt><dd>{}</dd></dl>",
                views::escape(&user.name),
                views::escape(&user.email),
                views::escape(&user.language)
            ));
        }
        _ => {}
    }

    let Some(business) = primary_business(session).await? else {
        return Ok("<p>Set up your business to get started.</p>".to_string());
    };
    let id = business.id.as_str();

    let html = match section {
        Section::Analytics => {
            let overview = client.analytics_overview(id).await?;
            format!(
                "<dl><dt>Total scans</dt><dd>{}</dd><dt>Unique visitors</dt><dd>{}</dd><dt>Top platform</dt><dd>{}</dd><dt>Trend</dt><dd>{:+.1}%</dd></dl>",
                overview.total_scans,
                overview.unique_visitors,
                views::escape(overview.top_platform.as_deref().unwrap_or("-")),
                overview.scans_trend
            )
        }
        Section::Devices => {
            let items: Vec<String> = client
                .devices(id)
                .await?
                .iter()
                .map(|device| {
                    format!(
                        "{} <code>{}</code> {}",
                        views::escape(device.label.as_deref().unwrap_or("Unnamed device")),
                        views::escape(&device.code),
                        if device.is_active { "active" } else { "inactive" }
                    )
                })
                .collect();
            views::list(&items, "No devices yet.")
        }
        Section::Locations => {
            let items: Vec<String> = client
                .locations(id)
                .await?
                .iter()
                .map(|location| {
                    format!(
                        "{}{}",
                        views::escape(&location.name),
                        if location.is_primary { " (primary)" } else { "" }
                    )
                })
                .collect();
            views::list(&items, "No locations yet.")
        }
        Section::Platforms => {
            let items: Vec<String> = client
                .platforms(id)
                .await?
                .iter()
                .map(|platform| {
                    let name = platform
                        .display_name
                        .clone()
                        .unwrap_or_else(|| format!("{:?}", platform.platform));
                    format!(
                        r#"<a href="{}">{}</a>"#,
                        views::escape(&platform.url),
                        views::escape(&name)
                    )
                })
                .collect();
            views::list(&items, "No review platforms yet.")
        }
        Section::LandingPage => {
            let page = client.landing_page(id).await?;
            format!(
                "<p>{}</p><p>{}</p>",
                views::escape(page.headline.as_deref().unwrap_or("No headline set.")),
                views::escape(page.subheadline.as_deref().unwrap_or_default())
            )
        }
        Section::Orders | Section::Subscription | Section::Settings => String::new(),
    };
    Ok(html)
}
