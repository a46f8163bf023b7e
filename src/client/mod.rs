//! Client side of Quill: a typed API client, the session store that
//! mirrors the signed-in identity, and the route guard built on it.

pub mod api;
pub mod guard;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use guard::{guard_for_path, GuardOutcome, GuardState, RouteGuard};
pub use session::{SessionEvent, SessionState, SessionStore};
