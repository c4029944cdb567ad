//! Sign-up, sign-in, sign-out and session observation.
//!
//! The gate validates form input locally, forwards accepted requests to an
//! [`AuthConnector`], and mirrors the resulting session into the shared
//! [`SessionStore`].

pub mod session;
pub mod validation;

use crate::config::AuthConfig;
use crate::connectors::supabase::{
    self, AuthConnector, Credentials, SignUpRequest, SignUpResponse, UserMetadata,
};
use session::{AuthEvent, SessionStore, SessionView};
use thiserror::Error;
use tracing::{error, info, warn};
use validation::ValidationError;

pub const REGISTRATION_SUCCESS: &str =
    "Registration successful! Please check your email to verify your account.";
pub const INVALID_EMAIL_MESSAGE: &str =
    "Please use a real email address. Supabase requires email verification.";
pub const REGISTRATION_FAILED: &str = "Failed to register user";
pub const LOGIN_FAILED: &str = "Failed to login";

const INVALID_EMAIL_CODE: &str = "email_address_invalid";

/// Where the user should be after an identity operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The unauthenticated register / login view.
    Entry,
    /// The personal task list.
    Tasks,
}

/// Errors surfaced to the user by identity operations. `Display` is the user-facing text.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Provider(String),
    #[error("An unexpected error occurred")]
    Unexpected(#[source] supabase::Error),
}

impl Error {
    /// Provider rejections keep their message; anything else collapses to `Unexpected`.
    fn from_provider(error: supabase::Error, fallback: &str) -> Self {
        match error {
            supabase::Error::Api { message, .. } if message.is_empty() => {
                Error::Provider(fallback.to_string())
            }
            supabase::Error::Api { message, .. } => Error::Provider(message),
            other => {
                error!(error = ?other, "Unexpected failure talking to the auth service");
                Error::Unexpected(other)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn new(
        display_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

fn is_invalid_email_rejection(error: &supabase::Error) -> bool {
    match error {
        supabase::Error::Api { code, message, .. } => {
            code.as_deref() == Some(INVALID_EMAIL_CODE) || message.contains("invalid")
        }
        _ => false,
    }
}

pub struct IdentityGate<'a, AUTH: AuthConnector> {
    auth: &'a AUTH,
    sessions: &'a SessionStore,
    config: &'a AuthConfig,
}

impl<'a, AUTH: AuthConnector> IdentityGate<'a, AUTH> {
    pub fn new(auth: &'a AUTH, sessions: &'a SessionStore, config: &'a AuthConfig) -> Self {
        Self {
            auth,
            sessions,
            config,
        }
    }

    /// Registers a new account from `form`.
    ///
    /// Nothing is sent unless the form passes [`validation::validate_registration`].
    /// On success the form is cleared and the verification notice is returned.
    #[tracing::instrument(skip_all, fields(email = %form.email))]
    pub async fn register(&self, form: &mut RegistrationForm) -> Result<&'static str, Error> {
        validation::validate_registration(form)?;

        let request = SignUpRequest {
            email: form.email.clone(),
            password: form.password.clone(),
            data: UserMetadata {
                display_name: Some(form.display_name.clone()),
            },
            redirect_to: self.config.email_redirect_to.clone(),
        };
        match self.auth.sign_up(&request).await {
            Ok(SignUpResponse::Session(session)) => {
                info!(user_id = %session.user.id, "Registered and signed in");
                self.sessions.publish(AuthEvent::SignedIn, Some(session));
            }
            Ok(SignUpResponse::User(user)) => {
                info!(user_id = %user.id, "Registered, awaiting email verification");
            }
            Err(error) if is_invalid_email_rejection(&error) => {
                warn!(%error, "Provider refused the email address");
                return Err(Error::Provider(INVALID_EMAIL_MESSAGE.to_string()));
            }
            Err(error) => return Err(Error::from_provider(error, REGISTRATION_FAILED)),
        }

        form.clear();
        Ok(REGISTRATION_SUCCESS)
    }

    /// Signs in with email and password, routing to the task view on success.
    #[tracing::instrument(skip_all, fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<Route, Error> {
        validation::validate_login(form)?;

        let credentials = Credentials {
            email: form.email.clone(),
            password: form.password.clone(),
        };
        let session = self
            .auth
            .sign_in_with_password(&credentials)
            .await
            .map_err(|error| Error::from_provider(error, LOGIN_FAILED))?;
        self.sessions.publish(AuthEvent::SignedIn, Some(session));
        Ok(Route::Tasks)
    }

    /// Live view of the current identity. Drop it to stop observing.
    pub fn observe_session(&self) -> SessionView {
        SessionView::attach(self.sessions)
    }

    /// Ends the session and routes back to the entry view.
    ///
    /// The local session is cleared even if the server could not be told.
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&self) -> Route {
        if let Some(session) = self.sessions.get_session() {
            if let Err(error) = self.auth.sign_out(&session).await {
                warn!(%error, "Remote sign-out failed, clearing the local session anyway");
            }
        }
        self.sessions.publish(AuthEvent::SignedOut, None);
        Route::Entry
    }
}

/// Decides which view an observer of `view` may see.
pub fn gate(view: &SessionView) -> Route {
    if view.is_authenticated() {
        Route::Tasks
    } else {
        Route::Entry
    }
}
