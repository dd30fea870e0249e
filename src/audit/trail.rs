use std::collections::VecDeque;

use parking_lot::Mutex;

use super::AuditEvent;
use crate::config::DEFAULT_AUDIT_CAPACITY;

/// Bounded in-memory recorder for audit events.
///
/// Safe to share across request threads; events keep the order in which
/// they were recorded. Once `capacity` events are held, recording a new one
/// drops the oldest.
///
/// # Example
///
/// ```
/// use accounts_core::audit::{AuditEvent, AuditEventKind, AuditOutcome, AuditTrail};
///
/// let trail = AuditTrail::new();
/// trail.record(AuditEvent::new(
///     "req-123",
///     Some("jerry"),
///     AuditEventKind::Authentication,
///     AuditOutcome::Success,
/// ));
///
/// assert_eq!(trail.len(), 1);
/// ```
#[derive(Debug)]
pub struct AuditTrail {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditTrail {
    /// A trail holding up to 10 000 events.
    pub fn new() -> Self {
        Self::default()
    }

    /// A trail holding up to `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot of the retained events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events recorded for one request, in order.
    pub fn for_request(&self, request_id: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id() == request_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventKind, AuditOutcome};
    use std::sync::Arc;
    use std::thread;

    fn event(request_id: &str) -> AuditEvent {
        AuditEvent::new(
            request_id,
            Some("tom"),
            AuditEventKind::StateChange,
            AuditOutcome::Success,
        )
    }

    #[test]
    fn records_in_order() {
        let trail = AuditTrail::new();
        trail.record(event("req-1"));
        trail.record(event("req-2"));

        let events = trail.events();
        assert_eq!(events[0].request_id(), "req-1");
        assert_eq!(events[1].request_id(), "req-2");
    }

    #[test]
    fn filters_by_request() {
        let trail = AuditTrail::new();
        trail.record(event("req-1"));
        trail.record(event("req-2"));
        trail.record(event("req-1"));

        assert_eq!(trail.for_request("req-1").len(), 2);
        assert!(trail.for_request("req-3").is_empty());
    }

    #[test]
    fn overflow_drops_oldest_events() {
        let trail = AuditTrail::with_capacity(3);
        for i in 0..5 {
            trail.record(event(&format!("req-{}", i)));
        }

        assert_eq!(trail.len(), 3);
        let ids: Vec<String> = trail.events().iter().map(|e| e.request_id().to_string()).collect();
        assert_eq!(ids, ["req-2", "req-3", "req-4"]);
        assert!(trail.for_request("req-0").is_empty());
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let trail = AuditTrail::with_capacity(0);
        trail.record(event("req-1"));
        trail.record(event("req-2"));
        assert_eq!(trail.capacity(), 1);
        assert_eq!(trail.events()[0].request_id(), "req-2");
    }

    #[test]
    fn clear_empties_trail() {
        let trail = AuditTrail::new();
        trail.record(event("req-1"));
        trail.clear();
        assert!(trail.is_empty());
    }

    #[test]
    fn concurrent_records_are_all_kept() {
        let trail = Arc::new(AuditTrail::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let trail = Arc::clone(&trail);
                thread::spawn(move || {
                    for j in 0..25 {
                        trail.record(event(&format!("req-{}-{}", i, j)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(trail.len(), 100);
    }
}
