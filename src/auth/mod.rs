//! Login, register and logout as single operations over the session, plus
//! the form validation that runs before any of them reach the network.

pub mod forms;
mod service;

pub use forms::{ForgotPasswordForm, LoginForm, RegisterForm};
pub use service::{AuthError, AuthService, LogoutOutcome, LOGOUT_REDIRECT};
