//! Audit event schema.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::Ctx;
use crate::model::UserId;

/// Category of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Login attempt or credential resolution
    Authentication,
    /// Policy decision that denied a request
    Authorization,
    /// A user record was created, changed or removed
    StateChange,
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEventKind::Authentication => write!(f, "authentication"),
            AuditEventKind::Authorization => write!(f, "authorization"),
            AuditEventKind::StateChange => write!(f, "state_change"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The action went through
    Success,
    /// The policy or the credential check refused it
    Denied,
    /// It failed for an internal reason
    Error,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Error => write!(f, "error"),
        }
    }
}

/// One audited action.
///
/// Holds identifiers only. Passwords, token keys and request bodies are never
/// part of an event; for login attempts the `principal` is the username that
/// was tried.
///
/// # Example
///
/// ```
/// use accounts_core::audit::{AuditEvent, AuditEventKind, AuditOutcome};
/// use accounts_core::UserId;
///
/// let event = AuditEvent::new(
///     "req-123",
///     Some("jerry"),
///     AuditEventKind::StateChange,
///     AuditOutcome::Success,
/// )
/// .with_action("delete")
/// .with_target(UserId(2));
///
/// assert_eq!(event.request_id(), "req-123");
/// assert_eq!(event.target(), Some(UserId(2)));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    request_id: String,
    principal: Option<String>,
    kind: AuditEventKind,
    outcome: AuditOutcome,
    action: Option<String>,
    target: Option<UserId>,
    method: Option<String>,
    timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates an event with the required fields, stamped now.
    pub fn new(
        request_id: impl Into<String>,
        principal: Option<impl Into<String>>,
        kind: AuditEventKind,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            principal: principal.map(Into::into),
            kind,
            outcome,
            action: None,
            target: None,
            method: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates an event for the request behind `ctx`, carrying its id,
    /// principal and method.
    pub fn for_request<S>(ctx: &Ctx<S>, kind: AuditEventKind, outcome: AuditOutcome) -> Self {
        Self::new(
            ctx.request_id(),
            ctx.principal().map(|p| p.username.as_str()),
            kind,
            outcome,
        )
        .with_method(ctx.method().as_str())
    }

    /// Sets the action name, e.g. `create` or `login`.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the user record acted upon.
    pub fn with_target(mut self, target: UserId) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn kind(&self) -> AuditEventKind {
        self.kind
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn target(&self) -> Option<UserId> {
        self.target
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[kind={}, outcome={}, request_id={}, principal={}",
            self.kind,
            self.outcome,
            self.request_id,
            self.principal.as_deref().unwrap_or("<none>")
        )?;
        if let Some(action) = &self.action {
            write!(f, ", action={}", action)?;
        }
        if let Some(target) = self.target {
            write!(f, ", target={}", target)?;
        }
        if let Some(method) = &self.method {
            write!(f, ", method={}", method)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestMeta;
    use crate::test_utils::principal;
    use http::Method;

    #[test]
    fn kind_and_outcome_display() {
        assert_eq!(AuditEventKind::StateChange.to_string(), "state_change");
        assert_eq!(AuditOutcome::Denied.to_string(), "denied");
    }

    #[test]
    fn for_request_copies_ctx_fields() {
        let meta = RequestMeta::authenticated("req-9", principal(4, "spike", true));
        let ctx = Ctx::new(&meta, Method::DELETE);
        let event = AuditEvent::for_request(&ctx, AuditEventKind::StateChange, AuditOutcome::Success);

        assert_eq!(event.request_id(), "req-9");
        assert_eq!(event.principal(), Some("spike"));
        assert_eq!(event.method(), Some("DELETE"));
        assert!(event.target().is_none());
    }

    #[test]
    fn display_marks_anonymous_principal() {
        let event = AuditEvent::new(
            "req-anon",
            None::<String>,
            AuditEventKind::Authorization,
            AuditOutcome::Denied,
        )
        .with_action("create");

        let out = event.to_string();
        assert!(out.contains("<none>"));
        assert!(out.contains("action=create"));
    }

    #[test]
    fn serializes_with_snake_case_enums() {
        let event = AuditEvent::new(
            "req-1",
            Some("tom"),
            AuditEventKind::StateChange,
            AuditOutcome::Success,
        )
        .with_target(UserId(2));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "state_change");
        assert_eq!(value["outcome"], "success");
        assert_eq!(value["target"], 2);
    }
}
