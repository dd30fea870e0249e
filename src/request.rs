use crate::model::{User, UserId};

/// Metadata about an incoming request.
///
/// Carries the request identifier and the acting principal. `principal` is
/// `None` for anonymous requests; it is resolved once per request from the
/// credential and passed explicitly from there on.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// Authenticated principal, if any
    pub principal: Option<Principal>,
}

impl RequestMeta {
    /// Metadata for an anonymous request.
    pub fn anonymous(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            principal: None,
        }
    }

    /// Metadata for a request made by `principal`.
    pub fn authenticated(request_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            request_id: request_id.into(),
            principal: Some(principal),
        }
    }
}

/// An authenticated user acting on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Identity of the acting user
    pub id: UserId,
    /// Login name, for logs and audit events
    pub username: String,
    /// Elevated privilege
    pub is_superuser: bool,
}

impl Principal {
    /// Builds the principal acting as `user`.
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
        }
    }

    /// Returns true if this principal may bypass ownership checks.
    pub fn is_elevated(&self) -> bool {
        self.is_superuser
    }

    /// Returns true if `target` is this principal's own record.
    pub fn owns(&self, target: &User) -> bool {
        self.id == target.id
    }
}
