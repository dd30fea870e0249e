//! Audit trail for authentication, authorization and record changes.
//!
//! Events carry identifiers only: no passwords, no token keys, no request
//! bodies.

mod event;
mod log;
mod trail;

pub use event::{AuditEvent, AuditEventKind, AuditOutcome};
pub use log::AuditLog;
pub use trail::AuditTrail;
