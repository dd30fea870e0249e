//! Audit emitter: every event goes to `tracing` under the `accounts_audit`
//! target and into the shared [`AuditTrail`].

use std::sync::Arc;

use super::{AuditEvent, AuditTrail};

/// Emits audit events.
///
/// Cloning is cheap; clones share one trail.
///
/// # Example
///
/// ```
/// use accounts_core::audit::{AuditEvent, AuditEventKind, AuditLog, AuditOutcome};
///
/// let audit = AuditLog::new();
/// audit.emit(AuditEvent::new(
///     "req-1",
///     Some("jerry"),
///     AuditEventKind::Authentication,
///     AuditOutcome::Success,
/// ).with_action("login"));
///
/// assert_eq!(audit.trail().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    trail: Arc<AuditTrail>,
}

impl AuditLog {
    /// Creates an emitter with a fresh trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an emitter with a fresh trail holding up to `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_trail(Arc::new(AuditTrail::with_capacity(capacity)))
    }

    /// Creates an emitter recording into an existing trail.
    pub fn with_trail(trail: Arc<AuditTrail>) -> Self {
        Self { trail }
    }

    /// The trail events are recorded into.
    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }

    /// Logs `event` as a structured tracing event and records it.
    pub fn emit(&self, event: AuditEvent) {
        tracing::info!(
            target: "accounts_audit",
            request_id = %event.request_id(),
            principal = ?event.principal(),
            kind = %event.kind(),
            outcome = %event.outcome(),
            action = ?event.action(),
            target_user = ?event.target().map(|id| id.0),
            method = ?event.method(),
            "audit event"
        );
        self.trail.record(event);
    }
}
