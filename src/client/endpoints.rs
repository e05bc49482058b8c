//! Typed wrappers for the backend endpoints. Auth calls carry credentials and
//! must never log their payloads.

use super::{
    types::{
        AnalyticsOverview, AuthSession, Business, CreateBusinessPayload, Device,
        ForgotPasswordPayload, LandingPage, Location, LoginPayload, MessageResponse, Order, Page,
        Product, RegisterPayload, ReviewPlatform, SubscriptionPlan, UpdateBusinessPayload, User,
    },
    ApiClient, ApiError,
};
use url::Url;

/// Percent-encode a caller-supplied path segment with the path-segment set,
/// so `/` becomes `%2F` and a space `%20`.
fn segment(value: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return String::new();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

impl ApiClient {
    /// # Errors
    /// Returns [`ApiError`] when the backend rejects the credentials or is unreachable.
    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthSession, ApiError> {
        self.post("/auth/login", payload).await
    }

    /// # Errors
    /// Returns [`ApiError`] when the backend rejects the registration or is unreachable.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<AuthSession, ApiError> {
        self.post("/auth/register", payload).await
    }

    /// Revoke the current token on the backend.
    ///
    /// # Errors
    /// Returns [`ApiError`] when the backend cannot be reached or refuses.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.post_empty("/auth/logout").await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure; callers decide whether to surface it.
    pub async fn forgot_password(
        &self,
        payload: &ForgotPasswordPayload,
    ) -> Result<MessageResponse, ApiError> {
        self.post("/auth/forgot-password", payload).await
    }

    /// # Errors
    /// Returns [`ApiError`]; a 401 means the token is missing or stale.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get("/auth/user").await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_page("/products").await.map(|page| page.data)
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn product(&self, slug: &str) -> Result<Product, ApiError> {
        self.get(&format!("/products/{}", segment(slug))).await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn pricing_plans(&self) -> Result<Vec<SubscriptionPlan>, ApiError> {
        self.get("/pricing").await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn businesses(&self) -> Result<Page<Business>, ApiError> {
        self.get_page("/businesses").await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn business(&self, id: &str) -> Result<Business, ApiError> {
        self.get(&format!("/businesses/{}", segment(id))).await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure, including field-level validation errors.
    pub async fn create_business(
        &self,
        payload: &CreateBusinessPayload,
    ) -> Result<Business, ApiError> {
        self.post("/businesses", payload).await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure, including field-level validation errors.
    pub async fn update_business(
        &self,
        id: &str,
        payload: &UpdateBusinessPayload,
    ) -> Result<Business, ApiError> {
        self.put(&format!("/businesses/{}", segment(id)), payload)
            .await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn delete_business(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/businesses/{}", segment(id))).await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn locations(&self, business_id: &str) -> Result<Vec<Location>, ApiError> {
        self.get_page(&format!("/businesses/{}/locations", segment(business_id)))
            .await
            .map(|page| page.data)
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn platforms(&self, business_id: &str) -> Result<Vec<ReviewPlatform>, ApiError> {
        self.get_page(&format!("/businesses/{}/platforms", segment(business_id)))
            .await
            .map(|page| page.data)
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn devices(&self, business_id: &str) -> Result<Vec<Device>, ApiError> {
        self.get_page(&format!("/businesses/{}/devices", segment(business_id)))
            .await
            .map(|page| page.data)
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn analytics_overview(
        &self,
        business_id: &str,
    ) -> Result<AnalyticsOverview, ApiError> {
        self.get(&format!(
            "/businesses/{}/analytics/overview",
            segment(business_id)
        ))
        .await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn landing_page(&self, business_id: &str) -> Result<LandingPage, ApiError> {
        self.get(&format!("/businesses/{}/landing-page", segment(business_id)))
            .await
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get_page("/orders").await.map(|page| page.data)
    }

    /// # Errors
    /// Returns [`ApiError`] on failure.
    pub async fn order(&self, id: &str) -> Result<Order, ApiError> {
        self.get(&format!("/orders/{}", segment(id))).await
    }
}
