//! Role gates. Pure functions of the caller's identity; the handlers call
//! them before any validation or store access.

use hireprep_types::models::Role;

use crate::error::ApiError;
use crate::identity::Identity;

/// Whether an identity without a role claim may post reviews. Such callers
/// are authenticated but predate roles, and are let through.
pub const LEGACY_IDENTITY_MAY_REVIEW: bool = true;

fn is_staff(role: Option<&Role>) -> bool {
    matches!(role, Some(Role::Admin | Role::Faculty))
}

pub fn can_create_notice(identity: &Identity) -> bool {
    is_staff(identity.role())
}

pub fn can_delete_notice(identity: &Identity) -> bool {
    is_staff(identity.role())
}

pub fn can_create_review(identity: &Identity) -> bool {
    match identity {
        Identity::Member { role, .. } => *role == Role::Student,
        Identity::Legacy { .. } => LEGACY_IDENTITY_MAY_REVIEW,
    }
}

pub fn require(allowed: bool, message: &str) -> Result<(), ApiError> {
    if allowed {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(message.to_string()))
    }
}
