//! The authorization policy: read for everyone, create for admins, change
//! or delete yourself unless you are an admin.
//!
//! All functions here are pure. They take the method, the acting principal
//! (`None` when anonymous) and, for object-level checks, the target record.

use http::Method;

use crate::error::Violation;
use crate::model::User;
use crate::request::Principal;

/// Returns true for methods that never mutate state.
pub fn is_safe(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Name of the action a write method performs, used in denials and audit.
pub fn action_name(method: &Method) -> &'static str {
    if method == Method::POST {
        "create"
    } else if method == Method::PATCH {
        "partial_update"
    } else if method == Method::PUT {
        "update"
    } else if method == Method::DELETE {
        "delete"
    } else if is_safe(method) {
        "read"
    } else {
        "write"
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No principal; reported as 401.
    Unauthenticated,
    /// Principal lacks rights; reported as 403.
    Forbidden,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused.
    Deny(DenyReason),
}

impl Decision {
    fn deny_for(principal: Option<&Principal>) -> Self {
        match principal {
            None => Decision::Deny(DenyReason::Unauthenticated),
            Some(_) => Decision::Deny(DenyReason::Forbidden),
        }
    }

    /// Returns true for [`Decision::Allow`].
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts a denial into the matching [`Violation`].
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for anonymous denials, `Forbidden` otherwise.
    pub fn into_result(self, method: &Method) -> Result<(), Violation> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(Violation::unauthenticated()),
            Decision::Deny(DenyReason::Forbidden) => {
                Err(Violation::forbidden(action_name(method)))
            }
        }
    }
}

/// Coarse check, made before any target is loaded.
///
/// Safe methods always pass. Creation requires elevated privilege. Any other
/// write requires an authenticated principal.
pub fn has_permission(method: &Method, principal: Option<&Principal>) -> Decision {
    if is_safe(method) {
        return Decision::Allow;
    }
    match principal {
        None => Decision::deny_for(None),
        Some(p) if method == Method::POST => {
            if p.is_elevated() {
                Decision::Allow
            } else {
                Decision::deny_for(Some(p))
            }
        }
        Some(_) => Decision::Allow,
    }
}

/// Object-level check against an existing record.
///
/// Safe methods always pass. Writes pass for the record's own principal or an
/// elevated one.
pub fn has_object_permission(
    method: &Method,
    principal: Option<&Principal>,
    target: &User,
) -> Decision {
    if is_safe(method) {
        return Decision::Allow;
    }
    match principal {
        Some(p) if p.owns(target) || p.is_elevated() => Decision::Allow,
        other => Decision::deny_for(other),
    }
}

/// Full evaluation: the coarse check, then the object-level check when a
/// target exists.
pub fn evaluate(method: &Method, principal: Option<&Principal>, target: Option<&User>) -> Decision {
    let coarse = has_permission(method, principal);
    if !coarse.is_allowed() {
        return coarse;
    }
    match target {
        Some(target) => has_object_permission(method, principal, target),
        None => Decision::Allow,
    }
}
