//! Public storefront pages.

use super::{locale_param, not_found, unavailable};
use crate::{
    client::types::{BillingInterval, Product},
    web::{session::RequestSession, views},
};
use axum::{extract::Path, response::Response};

fn product_item(locale: crate::locale::Locale, product: &Product) -> String {
    format!(
        r#"<a href="/{locale}/products/{}">{}</a> <span>{}</span>"#,
        views::escape(&product.slug),
        views::escape(&product.name),
        views::price(product.price_cents, &product.currency)
    )
}

pub async fn home(Path(locale): Path<String>, session: RequestSession) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let user = session.auth().current_user().await;

    let body = format!(
        r#"<p>Collect more reviews with a tap. NFC and QR stands that send customers straight to your review page.</p>
<p><a href="/{locale}/products">Browse products</a> <a href="/{locale}/pricing">See pricing</a></p>"#
    );
    session.respond(views::layout(locale, "Reviewtap", user.as_ref(), &body))
}

pub async fn products(Path(locale): Path<String>, session: RequestSession) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let client = session.auth().session().client();
    let user = session.auth().current_user().await;

    let body = match client.products().await {
        Ok(products) => {
            let items: Vec<String> = products
                .iter()
                .filter(|product| product.is_active)
                .map(|product| product_item(locale, product))
                .collect();
            views::list(&items, "No products available yet.")
        }
        Err(err) => unavailable(&err.message),
    };
    session.respond(views::layout(locale, "Products", user.as_ref(), &body))
}

pub async fn product(
    Path((locale, slug)): Path<(String, String)>,
    session: RequestSession,
) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let client = session.auth().session().client();
    let user = session.auth().current_user().await;

    let product = match client.product(&slug).await {
        Ok(product) => product,
        Err(err) if err.status == Some(404) => return session.respond(not_found()),
        Err(err) => {
            let body = unavailable(&err.message);
            return session.respond(views::layout(locale, "Product", user.as_ref(), &body));
        }
    };

    let mut body = format!(
        "<p>{}</p><p>{}</p>",
        views::escape(product.description.as_deref().unwrap_or_default()),
        views::price(product.price_cents, &product.currency)
    );
    if let Some(variants) = &product.variants {
        let items: Vec<String> = variants
            .iter()
            .filter(|variant| variant.is_active)
            .map(|variant| {
                format!(
                    "{} <span>{}</span>",
                    views::escape(&variant.name),
                    views::price(variant.price_cents, &product.currency)
                )
            })
            .collect();
        body.push_str(&views::list(&items, "No variants."));
    }
    session.respond(views::layout(locale, &product.name, user.as_ref(), &body))
}

pub async fn pricing(Path(locale): Path<String>, session: RequestSession) -> Response {
    let locale = match locale_param(&locale) {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let client = session.auth().session().client();
    let user = session.auth().current_user().await;

    let body = match client.pricing_plans().await {
        Ok(plans) => {
            let items: Vec<String> = plans
                .iter()
                .filter(|plan| plan.is_active)
                .map(|plan| {
                    let interval = match plan.interval {
                        BillingInterval::Monthly => "month",
                        BillingInterval::Yearly => "year",
                    };
                    format!(
                        "{} <span>{} / {interval}</span>",
                        views::escape(&plan.name),
                        views::price(plan.price_cents, &plan.currency)
                    )
                })
                .collect();
            format!(
                r#"{}<p><a href="/{locale}/register">Get started</a></p>"#,
                views::list(&items, "Plans are coming soon.")
            )
        }
        Err(err) => unavailable(&err.message),
    };
    session.respond(views::layout(locale, "Pricing", user.as_ref(), &body))
}
