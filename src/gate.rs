use crate::audit::{AuditEvent, AuditEventKind, AuditLog, AuditOutcome};
use crate::context::Ctx;
use crate::error::Violation;
use crate::model::User;
use crate::policy::{self, Decision};
use crate::state::{Permitted, Unchecked};

/// The policy enforcement gate.
///
/// `PolicyGate` is the only way to obtain a `Ctx<Permitted>`. It applies
/// [`policy::evaluate`] to the context's method and principal and, when a
/// target is attached, the object-level check against it.
///
/// Handlers that must answer 401/403 before 404 call
/// [`precheck`](Self::precheck) before loading the target. With an
/// [`AuditLog`] attached, every denial is also recorded as an authorization
/// event.
///
/// # Examples
///
/// ```
/// use accounts_core::{Ctx, PolicyGate, RequestMeta, ViolationKind};
/// use http::Method;
///
/// let ctx = Ctx::new(&RequestMeta::anonymous("req-1"), Method::POST);
/// let err = PolicyGate::new(ctx).build().unwrap_err();
///
/// assert_eq!(err.kind, ViolationKind::Unauthenticated);
/// ```
pub struct PolicyGate<'t> {
    ctx: Ctx<Unchecked>,
    target: Option<&'t User>,
    audit: Option<&'t AuditLog>,
}

impl<'t> PolicyGate<'t> {
    /// Creates a gate for the given context, with no target.
    pub fn new(ctx: Ctx<Unchecked>) -> Self {
        Self {
            ctx,
            target: None,
            audit: None,
        }
    }

    /// Records denials in `audit`.
    pub fn with_audit(mut self, audit: &'t AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Attaches the record the action applies to.
    pub fn with_target(mut self, target: &'t User) -> Self {
        self.target = Some(target);
        self
    }

    /// Runs only the coarse check.
    ///
    /// # Errors
    ///
    /// Returns the `Violation` the coarse check produces.
    pub fn precheck(&self) -> Result<(), Violation> {
        let decision = policy::has_permission(self.ctx.method(), self.ctx.principal());
        self.report(decision)
    }

    /// Evaluates the full policy and yields a permitted context.
    ///
    /// # Errors
    ///
    /// Returns `Violation` with kind `Unauthenticated` for anonymous denials
    /// and `Forbidden` for authenticated ones.
    pub fn build(self) -> Result<Ctx<Permitted>, Violation> {
        let decision = policy::evaluate(self.ctx.method(), self.ctx.principal(), self.target);
        self.report(decision)?;
        Ok(self.ctx.permit(self.target.map(|t| t.id)))
    }

    fn report(&self, decision: Decision) -> Result<(), Violation> {
        let log = self.ctx.log();
        let target = self.target.map(|t| t.id.to_string());
        match decision {
            Decision::Allow => {
                log.debug(format_args!(
                    "policy allowed {} on {}",
                    self.ctx.method(),
                    target.as_deref().unwrap_or("collection")
                ));
                Ok(())
            }
            Decision::Deny(reason) => {
                log.info(format_args!(
                    "policy denied {} on {} ({:?})",
                    self.ctx.method(),
                    target.as_deref().unwrap_or("collection"),
                    reason
                ));
                if let Some(audit) = self.audit {
                    let mut event = AuditEvent::for_request(
                        &self.ctx,
                        AuditEventKind::Authorization,
                        AuditOutcome::Denied,
                    )
                    .with_action(policy::action_name(self.ctx.method()));
                    if let Some(target) = self.target {
                        event = event.with_target(target.id);
                    }
                    audit.emit(event);
                }
                decision.into_result(self.ctx.method())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationKind;
    use crate::model::UserId;
    use crate::request::RequestMeta;
    use crate::test_utils::{principal, user};
    use http::Method;

    fn ctx(meta: &RequestMeta, method: Method) -> Ctx<Unchecked> {
        Ctx::new(meta, method)
    }

    #[test]
    fn anonymous_list_is_permitted() {
        let meta = RequestMeta::anonymous("req-1");
        let permitted = PolicyGate::new(ctx(&meta, Method::GET)).build().unwrap();
        assert!(permitted.target().is_none());
    }

    #[test]
    fn plain_user_cannot_create() {
        let meta = RequestMeta::authenticated("req-2", principal(2, "tom", false));
        let err = PolicyGate::new(ctx(&meta, Method::POST)).build().unwrap_err();
        assert_eq!(err.kind, ViolationKind::Forbidden { action: "create" });
    }

    #[test]
    fn precheck_ignores_target() {
        let meta = RequestMeta::authenticated("req-3", principal(2, "tom", false));
        let other = user(1, "jerry", true);
        let gate = PolicyGate::new(ctx(&meta, Method::DELETE)).with_target(&other);

        assert!(gate.precheck().is_ok());
        let err = gate.build().unwrap_err();
        assert_eq!(err.kind, ViolationKind::Forbidden { action: "delete" });
    }

    #[test]
    fn precheck_rejects_anonymous_write() {
        let meta = RequestMeta::anonymous("req-4");
        let gate = PolicyGate::new(ctx(&meta, Method::PATCH));
        assert_eq!(
            gate.precheck().unwrap_err().kind,
            ViolationKind::Unauthenticated
        );
    }

    #[test]
    fn permitted_ctx_records_target() {
        let meta = RequestMeta::authenticated("req-5", principal(2, "tom", false));
        let own = user(2, "tom", false);
        let permitted = PolicyGate::new(ctx(&meta, Method::PATCH))
            .with_target(&own)
            .build()
            .unwrap();

        assert!(permitted.permits(UserId(2)));
        assert_eq!(permitted.principal().map(|p| p.username.as_str()), Some("tom"));
    }

    #[test]
    fn denials_are_audited() {
        let audit = AuditLog::new();
        let meta = RequestMeta::authenticated("req-6", principal(2, "tom", false));
        let other = user(1, "jerry", true);

        let result = PolicyGate::new(ctx(&meta, Method::PATCH))
            .with_audit(&audit)
            .with_target(&other)
            .build();
        assert!(result.is_err());

        let events = audit.trail().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), AuditEventKind::Authorization);
        assert_eq!(events[0].outcome(), AuditOutcome::Denied);
        assert_eq!(events[0].action(), Some("partial_update"));
        assert_eq!(events[0].target(), Some(UserId(1)));
    }

    #[test]
    fn allowed_requests_are_not_audited() {
        let audit = AuditLog::new();
        let meta = RequestMeta::anonymous("req-7");
        PolicyGate::new(ctx(&meta, Method::GET))
            .with_audit(&audit)
            .build()
            .unwrap();
        assert!(audit.trail().is_empty());
    }
}
