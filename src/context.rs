use std::marker::PhantomData;

use http::Method;

use crate::logging::RequestLog;
use crate::model::UserId;
use crate::request::{Principal, RequestMeta};
use crate::state::{Permitted, Unchecked};

/// Per-request execution context.
///
/// `Ctx<S>` carries the request id, the acting principal and the method, and
/// is generic over whether the policy has been applied:
///
/// ```text
/// Ctx<Unchecked> --PolicyGate::build--> Ctx<Permitted>
/// ```
///
/// Operations that mutate records take `&Ctx<Permitted>`, so they cannot run
/// before the policy allowed them.
///
/// # Examples
///
/// ```
/// use accounts_core::{Ctx, PolicyGate, RequestMeta};
/// use http::Method;
///
/// let ctx = Ctx::new(&RequestMeta::anonymous("req-1"), Method::GET);
/// let permitted = PolicyGate::new(ctx).build().expect("reads are public");
///
/// assert_eq!(permitted.request_id(), "req-1");
/// assert!(permitted.principal().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Ctx<S = Permitted> {
    request_id: String,
    principal: Option<Principal>,
    method: Method,
    target: Option<UserId>,
    _state: PhantomData<S>,
}

impl<S> Ctx<S> {
    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the acting principal, `None` if anonymous.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the method being evaluated.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a logger that stamps every event with this request's id and
    /// principal.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(
            &self.request_id,
            self.principal.as_ref().map(|p| p.username.as_str()),
        )
    }
}

impl Ctx<Unchecked> {
    /// Creates an unchecked context for `method` from request metadata.
    pub fn new(meta: &RequestMeta, method: Method) -> Self {
        Self {
            request_id: meta.request_id.clone(),
            principal: meta.principal.clone(),
            method,
            target: None,
            _state: PhantomData,
        }
    }

    /// Marks the context as permitted for `target`.
    ///
    /// `pub(crate)`: only `PolicyGate` calls this, after the policy allowed it.
    pub(crate) fn permit(self, target: Option<UserId>) -> Ctx<Permitted> {
        Ctx {
            request_id: self.request_id,
            principal: self.principal,
            method: self.method,
            target,
            _state: PhantomData,
        }
    }
}

impl Ctx<Permitted> {
    /// The record the object-level check ran against, if any.
    pub fn target(&self) -> Option<UserId> {
        self.target
    }

    /// Returns true if this context was permitted for exactly `id`.
    pub fn permits(&self, id: UserId) -> bool {
        self.target == Some(id)
    }
}
