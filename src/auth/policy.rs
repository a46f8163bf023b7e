//! Ownership and role rules for mutating or privileged operations.
//!
//! | Action          | Allowed when                                   |
//! |-----------------|------------------------------------------------|
//! | EditPost        | requester is the author                        |
//! | DeletePost      | requester is the author, or an admin           |
//! | DeleteUser      | requester is an admin and the target is not    |
//!
//! Admin-only listings are gated once, by `require_admin` on the admin router.

use crate::auth::token::Identity;
use crate::db::models::Role;
use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    EditPost { author_id: &'a str },
    DeletePost { author_id: &'a str },
    DeleteUser { target_role: Role },
}

pub fn is_allowed(requester: &Identity, action: Action<'_>) -> bool {
    match action {
        Action::EditPost { author_id } => requester.id == author_id,
        Action::DeletePost { author_id } => {
            requester.id == author_id
                || match requester.role {
                    Role::Admin => true,
                    Role::User => false,
                }
        }
        Action::DeleteUser { target_role } => match (requester.role, target_role) {
            (Role::Admin, Role::User) => true,
            (Role::Admin, Role::Admin) | (Role::User, _) => false,
        },
    }
}

/// Like [`is_allowed`] but yields the Forbidden error the API returns.
pub fn authorize(requester: &Identity, action: Action<'_>) -> Result<(), AppError> {
    if is_allowed(requester, action) {
        return Ok(());
    }

    tracing::debug!(user = %requester.id, ?action, "Authorization denied");
    let message = match action {
        Action::EditPost { .. } => "Not authorized to update this post",
        Action::DeletePost { .. } => "Not authorized to delete this post",
        Action::DeleteUser {
            target_role: Role::Admin,
        } => "Admins cannot delete other admins.",
        Action::DeleteUser { .. } => "Access denied. Admin only.",
    };
    Err(AppError::forbidden(message))
}

/// Gate 2: the verified role must equal the required one.
pub fn require_role(identity: &Identity, required: Role) -> Result<(), AppError> {
    if identity.role == required {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Access denied. {} role required.",
            capitalize(required.as_str())
        )))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
