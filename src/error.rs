use std::collections::BTreeMap;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while serving an accounts request.
///
/// Every variant is local to the request that produced it. Use
/// [`Error::status`] to pick the HTTP status the web layer answers with.
#[derive(Debug, Error)]
pub enum Error {
    /// The authorization policy denied the action.
    #[error("policy violation: {0}")]
    Violation(#[from] Violation),

    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Login was attempted with an unknown username, a wrong password, or an
    /// inactive account.
    #[error("unable to log in with provided credentials")]
    InvalidCredentials,

    /// The request carried a credential that could not be resolved.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The addressed user record does not exist.
    #[error("not found")]
    NotFound,

    /// Password hashing or hash parsing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns the HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Violation(v) => v.kind.status(),
            Error::Validation(_) | Error::InvalidCredentials => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::PasswordHash(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A policy violation with details about what failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Denial for an anonymous principal attempting a write.
    pub fn unauthenticated() -> Self {
        Self::new(
            ViolationKind::Unauthenticated,
            "Authentication credentials were not provided.",
        )
    }

    /// Denial for an authenticated principal lacking rights for `action`.
    pub fn forbidden(action: &'static str) -> Self {
        Self::new(
            ViolationKind::Forbidden { action },
            "You do not have permission to perform this action.",
        )
    }
}

/// The kind of policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A write was attempted without credentials.
    Unauthenticated,
    /// The principal is authenticated but may not perform the action.
    Forbidden {
        /// The action that was refused
        action: &'static str,
    },
}

impl ViolationKind {
    /// 401 for anonymous principals, 403 for authenticated ones.
    pub fn status(&self) -> StatusCode {
        match self {
            ViolationKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ViolationKind::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unauthenticated => write!(f, "Unauthenticated"),
            ViolationKind::Forbidden { action } => write!(f, "Forbidden for '{}'", action),
        }
    }
}

/// Field-level validation messages, keyed by field name.
///
/// Fields iterate in name order so rendered bodies are stable.
///
/// # Examples
///
/// ```
/// use accounts_core::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.add("username", "This field is required.");
/// errors.add("password", "This field is required.");
///
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors.get("username"), Some(&["This field is required.".to_string()][..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Field name used for errors that belong to the payload as a whole.
    pub const NON_FIELD: &'static str = "non_field_errors";

    /// Creates an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error set holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Appends a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Iterates over `(field, messages)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of fields carrying at least one message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no messages were recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
