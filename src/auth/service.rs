use crate::{
    client::{
        types::{AuthSession, ForgotPasswordPayload, LoginPayload, RegisterPayload, User},
        ApiError,
    },
    session::SessionContext,
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Where the browser goes after signing out.
pub const LOGOUT_REDIRECT: &str = "/";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A later login, register or logout started before this one committed.
    #[error("superseded by a newer sign-in or sign-out")]
    Superseded,
}

impl AuthError {
    /// Backend error details, if the failure came from the API.
    #[must_use]
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Superseded => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub redirect_to: &'static str,
    /// `false` when the backend logout call failed; local state is cleared anyway.
    pub server_acknowledged: bool,
}

/// Flags an operation kind as in flight until dropped.
struct Pending<'a>(&'a AtomicBool);

impl<'a> Pending<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Login, register and logout over a [`SessionContext`].
///
/// Each operation takes a ticket when it starts. Its state writes run under a
/// single commit lock and only if no newer operation has started, so the most
/// recent operation always wins.
#[derive(Debug)]
pub struct AuthService {
    session: Arc<SessionContext>,
    sequence: AtomicU64,
    commit: Mutex<()>,
    login_pending: AtomicBool,
    register_pending: AtomicBool,
}

impl AuthService {
    #[must_use]
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self {
            session,
            sequence: AtomicU64::new(0),
            commit: Mutex::new(()),
            login_pending: AtomicBool::new(false),
            register_pending: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn is_login_pending(&self) -> bool {
        self.login_pending.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_register_pending(&self) -> bool {
        self.register_pending.load(Ordering::SeqCst)
    }

    /// Sign in and store the returned session.
    ///
    /// # Errors
    /// Returns [`AuthError::Api`] unchanged from the backend, or
    /// [`AuthError::Superseded`]; in both cases no state is written.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let _pending = Pending::start(&self.login_pending);
        let ticket = self.ticket();

        let payload = LoginPayload {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = self.session.client().login(&payload).await?;

        self.establish(ticket, session).await
    }

    /// Create an account and store the returned session.
    ///
    /// # Errors
    /// Same as [`AuthService::login`].
    #[instrument(skip(self, payload), fields(email = %payload.email))]
    pub async fn register(&self, payload: RegisterPayload) -> Result<User, AuthError> {
        let _pending = Pending::start(&self.register_pending);
        let ticket = self.ticket();

        let session = self.session.client().register(&payload).await?;

        self.establish(ticket, session).await
    }

    /// Revoke the session on the backend, then clear it locally regardless of
    /// the backend outcome.
    ///
    /// # Errors
    /// Returns [`AuthError::Superseded`] when a newer login or register
    /// started meanwhile; its session is left in place.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<LogoutOutcome, AuthError> {
        let ticket = self.ticket();

        let server_acknowledged = match self.session.client().logout().await {
            Ok(()) => true,
            Err(err) => {
                warn!("Backend logout failed, clearing local session anyway: {err}");
                false
            }
        };

        let _commit = self.commit.lock().await;
        if !self.is_current(ticket) {
            debug!("Logout superseded by a newer auth operation");
            return Err(AuthError::Superseded);
        }
        self.session.clear_token();
        self.session.invalidate_all();
        info!("Signed out");

        Ok(LogoutOutcome {
            redirect_to: LOGOUT_REDIRECT,
            server_acknowledged,
        })
    }

    /// Request a reset link. Always succeeds from the caller's point of view
    /// so responses never reveal whether an account exists.
    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) {
        let payload = ForgotPasswordPayload {
            email: email.to_string(),
        };
        if let Err(err) = self.session.client().forgot_password(&payload).await {
            debug!("Forgot-password request failed: {err}");
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.current_user().await
    }

    fn ticket(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == ticket
    }

    /// Token first, then user, so any reader woken by the user already has
    /// the token.
    async fn establish(&self, ticket: u64, session: AuthSession) -> Result<User, AuthError> {
        let _commit = self.commit.lock().await;
        if !self.is_current(ticket) {
            debug!("Discarding superseded auth response");
            return Err(AuthError::Superseded);
        }

        let AuthSession { user, token } = session;
        self.session.set_token(&token);
        self.session.set_user(Some(&user));
        info!(user_id = %user.id, "Signed in");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        tests::{context, user_json},
        QueryKey, TokenStore,
    };
    use anyhow::Result;
    use secrecy::{ExposeSecret, SecretString};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_login(server: &MockServer, token: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"user": user_json(), "token": token}}))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn login_sets_token_then_user_without_refetch() -> Result<()> {
        let server = MockServer::start().await;
        mount_login(&server, "tok_abc", Duration::ZERO).await;
        Mock::given(method("GET"))
            .and(path("/auth/user"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));

        let user = auth.login("a@b.com", "secret123").await?;
        assert_eq!(user.email, "a@b.com");
        assert_eq!(
            store.token().map(|t| t.expose_secret().to_string()).as_deref(),
            Some("tok_abc")
        );
        assert_eq!(auth.current_user().await, Some(user));
        assert!(!auth.is_login_pending());
        Ok(())
    }

    #[tokio::test]
    async fn failed_login_propagates_and_writes_nothing() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "These credentials do not match our records."
            })))
            .mount(&server)
            .await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));

        let err = auth.login("a@b.com", "wrong").await.err();
        let message = err.as_ref().and_then(AuthError::api).map(|e| e.message.as_str());
        assert_eq!(message, Some("These credentials do not match our records."));
        assert!(store.token().is_none());
        assert!(store.take_set_cookies().is_empty());
        assert!(auth.session().cached_user().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_everything_even_when_backend_fails() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));
        let session = auth.session();
        session.set_token(&SecretString::from("tok_abc"));
        session.cache().set(&QueryKey::current_user(), &user_json());
        session.cache().set(&QueryKey::new(["businesses"]), &json!([{"id": "b1"}]));

        let outcome = auth.logout().await?;
        assert_eq!(
            outcome,
            LogoutOutcome {
                redirect_to: "/",
                server_acknowledged: false,
            }
        );
        assert!(store.token().is_none());
        assert!(session.cached_user().is_none());
        assert!(session.cache().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn logout_started_after_login_wins() -> Result<()> {
        let server = MockServer::start().await;
        mount_login(&server, "tok_slow", Duration::from_millis(200)).await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));

        let login = auth.login("a@b.com", "secret123");
        let logout = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            auth.logout().await
        };
        let (login, logout) = tokio::join!(login, logout);

        assert_eq!(login.err(), Some(AuthError::Superseded));
        assert!(logout?.server_acknowledged);
        assert!(store.token().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn pending_flag_tracks_in_flight_login() -> Result<()> {
        let server = MockServer::start().await;
        mount_login(&server, "tok_abc", Duration::from_millis(100)).await;

        let (_, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));

        let login = auth.login("a@b.com", "secret123");
        let flags = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            (auth.is_login_pending(), auth.is_register_pending())
        };
        let (result, (login_pending, register_pending)) = tokio::join!(login, flags);

        result?;
        assert!(login_pending);
        assert!(!register_pending);
        assert!(!auth.is_login_pending());
        Ok(())
    }

    #[tokio::test]
    async fn forgot_password_hides_backend_failures() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/forgot-password"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "We can't find a user with that email address."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));
        auth.forgot_password("nobody@example.com").await;
        Ok(())
    }

    async fn mount_slow_user_fetch(server: &MockServer, status: u16) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(json!({"data": user_json()}))
        } else {
            ResponseTemplate::new(status).set_body_json(json!({"message": "Unauthenticated."}))
        };
        Mock::given(method("GET"))
            .and(path("/auth/user"))
            .and(header("authorization", "Bearer tok_old"))
            .respond_with(response.set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_login_as_new_user(server: &MockServer) {
        let mut user = user_json();
        user["id"] = json!("2");
        user["email"] = json!("new@b.com");
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"user": user, "token": "tok_new"}})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn user_fetch_from_old_session_does_not_overwrite_login() -> Result<()> {
        let server = MockServer::start().await;
        mount_slow_user_fetch(&server, 200).await;
        mount_login_as_new_user(&server).await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));
        auth.session().set_token(&SecretString::from("tok_old"));

        let login = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            auth.login("new@b.com", "secret123").await
        };
        let (fetched, login) = tokio::join!(auth.current_user(), login);

        assert_eq!(login?.email, "new@b.com");
        assert_eq!(fetched.map(|user| user.email).as_deref(), Some("new@b.com"));
        assert_eq!(
            auth.session().cached_user().map(|user| user.email).as_deref(),
            Some("new@b.com")
        );
        assert_eq!(
            store.token().map(|t| t.expose_secret().to_string()).as_deref(),
            Some("tok_new")
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejected_old_token_does_not_clear_new_login() -> Result<()> {
        let server = MockServer::start().await;
        mount_slow_user_fetch(&server, 401).await;
        mount_login_as_new_user(&server).await;

        let (store, context) = context(&server)?;
        let auth = AuthService::new(Arc::new(context));
        auth.session().set_token(&SecretString::from("tok_old"));

        let login = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            auth.login("new@b.com", "secret123").await
        };
        let (fetched, login) = tokio::join!(auth.current_user(), login);

        assert!(login.is_ok());
        assert_eq!(fetched.map(|user| user.email).as_deref(), Some("new@b.com"));
        assert_eq!(
            store.token().map(|t| t.expose_secret().to_string()).as_deref(),
            Some("tok_new")
        );
        assert_eq!(
            auth.session().cached_user().map(|user| user.email).as_deref(),
            Some("new@b.com")
        );
        Ok(())
    }
}
