/// Request data that has passed validation.
///
/// The service accepts payloads only as `Verified<NewUser>` or
/// `Verified<UserChanges>`, so nothing reaches the repository without going
/// through a sanitizer first.
///
/// # Construction Invariants
///
/// There is no public constructor and no `From<T>`. Construction is limited to
/// crate-internal validation code through `new_unchecked`.
///
/// ```compile_fail
/// use accounts_core::Verified;
///
/// let verified = Verified::new("data".to_string());
/// ```
///
/// # Access
///
/// - [`AsRef::as_ref`]: borrow the value
/// - [`into_inner`](Self::into_inner): consume and extract it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Wraps a value that the caller has already validated.
    ///
    /// `pub(crate)`: only sanitizers call this, after their checks pass.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Consumes the wrapper and returns the validated value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}
