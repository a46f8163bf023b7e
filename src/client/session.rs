//! Client-side mirror of the server identity.
//!
//! `SessionStore` starts out rehydrating (the "who am I" check made on page
//! load), settles into `Anonymous` or `Authenticated`, and moves through
//! `Pending` while a login, register or logout call is in flight. All
//! transitions go through [`SessionStore::apply`].

use crate::client::api::{ApiClient, ClientError};
use crate::db::models::PublicUser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Rehydrating,
    /// A sign-in/out call is in flight; the last known identity is kept.
    Pending { previous: Option<PublicUser> },
    Anonymous,
    Authenticated(PublicUser),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Rehydrated(PublicUser),
    /// `silent` is set for the plain "no cookie" 401.
    RehydrateFailed { message: String, silent: bool },
    RequestStarted,
    SignedIn(PublicUser),
    RequestFailed(String),
    SignedOut,
    ClearError,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    state: SessionState,
    error: Option<String>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: SessionState::Rehydrating,
            error: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&PublicUser> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Pending { previous } => previous.as_ref(),
            SessionState::Rehydrating | SessionState::Anonymous => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            SessionState::Rehydrating | SessionState::Pending { .. }
        )
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.apply(SessionEvent::ClearError);
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Rehydrated(user) => {
                self.state = SessionState::Authenticated(user);
            }
            SessionEvent::RehydrateFailed { message, silent } => {
                self.state = SessionState::Anonymous;
                if !silent {
                    self.error = Some(message);
                }
            }
            SessionEvent::RequestStarted => {
                let previous = self.user().cloned();
                self.state = SessionState::Pending { previous };
                self.error = None;
            }
            SessionEvent::SignedIn(user) => {
                self.state = SessionState::Authenticated(user);
            }
            SessionEvent::RequestFailed(message) => {
                self.state = match self.user().cloned() {
                    Some(user) => SessionState::Authenticated(user),
                    None => SessionState::Anonymous,
                };
                self.error = Some(message);
            }
            SessionEvent::SignedOut => {
                self.state = SessionState::Anonymous;
            }
            SessionEvent::ClearError => {
                self.error = None;
            }
        }
    }

    /// Resolve the identity for this page load. Only the first call while
    /// rehydrating talks to the server.
    pub async fn rehydrate(&mut self, api: &ApiClient) {
        if self.state != SessionState::Rehydrating {
            return;
        }
        let event = match api.me().await {
            Ok(user) => SessionEvent::Rehydrated(user),
            Err(err) => SessionEvent::RehydrateFailed {
                silent: err.is_missing_credential(),
                message: err.to_string(),
            },
        };
        self.apply(event);
    }

    pub async fn login(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        self.apply(SessionEvent::RequestStarted);
        let result = api.login(email, password).await;
        self.settle(result, "Login failed")
    }

    pub async fn register(
        &mut self,
        api: &ApiClient,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        self.apply(SessionEvent::RequestStarted);
        let result = api.register(username, email, password).await;
        self.settle(result, "Registration failed")
    }

    pub async fn logout(&mut self, api: &ApiClient) -> Result<(), ClientError> {
        self.apply(SessionEvent::RequestStarted);
        match api.logout().await {
            Ok(_) => {
                self.apply(SessionEvent::SignedOut);
                Ok(())
            }
            Err(err) => {
                self.apply(SessionEvent::RequestFailed(failure_message(&err, "Logout failed")));
                Err(err)
            }
        }
    }

    fn settle(
        &mut self,
        result: Result<PublicUser, ClientError>,
        fallback: &str,
    ) -> Result<(), ClientError> {
        match result {
            Ok(user) => {
                self.apply(SessionEvent::SignedIn(user));
                Ok(())
            }
            Err(err) => {
                self.apply(SessionEvent::RequestFailed(failure_message(&err, fallback)));
                Err(err)
            }
        }
    }
}

/// Server-provided message when there is one, otherwise the fallback.
fn failure_message(err: &ClientError, fallback: &str) -> String {
    match err {
        ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}
