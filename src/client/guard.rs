//! Client-side route guard. Advisory only: the server re-checks every
//! request, this just avoids rendering views the visitor cannot use.

use crate::client::session::SessionStore;
use crate::db::models::Role;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Unauthenticated,
    WrongRole,
    Authorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Identity still resolving; show a spinner instead of the view.
    Suspend,
    Redirect(&'static str),
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteGuard {
    required: Option<Role>,
}

impl RouteGuard {
    /// Any signed-in user.
    pub fn signed_in() -> Self {
        Self { required: None }
    }

    /// Signed in with exactly this role.
    pub fn with_role(role: Role) -> Self {
        Self {
            required: Some(role),
        }
    }

    pub fn state(&self, session: &SessionStore) -> GuardState {
        if session.is_loading() {
            return GuardState::Loading;
        }
        match (session.user(), self.required) {
            (None, _) => GuardState::Unauthenticated,
            (Some(user), Some(role)) if user.role != role => GuardState::WrongRole,
            (Some(_), _) => GuardState::Authorized,
        }
    }

    pub fn outcome(&self, session: &SessionStore) -> GuardOutcome {
        match self.state(session) {
            GuardState::Loading => GuardOutcome::Suspend,
            GuardState::Unauthenticated => GuardOutcome::Redirect(LOGIN_PATH),
            GuardState::WrongRole => GuardOutcome::Redirect(HOME_PATH),
            GuardState::Authorized => GuardOutcome::Render,
        }
    }
}

/// Guard for each protected front-end view; `None` means public.
pub fn guard_for_path(path: &str) -> Option<RouteGuard> {
    let path = path.trim_end_matches('/');
    match path {
        "/dashboard" | "/create-post" => Some(RouteGuard::signed_in()),
        "/admin" => Some(RouteGuard::with_role(Role::Admin)),
        p if p.starts_with("/edit-post/") => Some(RouteGuard::signed_in()),
        _ => None,
    }
}
