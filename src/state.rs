//! Type-state markers for request contexts.
//!
//! A context starts as `Ctx<Unchecked>` and becomes `Ctx<Permitted>` only by
//! passing through [`PolicyGate`](crate::PolicyGate).

/// Marker for a context the policy has not evaluated yet.
#[derive(Debug, Clone, Copy)]
pub struct Unchecked {
    _private: (),
}

/// Marker for a context the policy has allowed.
///
/// `Ctx<Permitted>` cannot be forged outside the crate.
#[derive(Debug, Clone, Copy)]
pub struct Permitted {
    _private: (),
}
