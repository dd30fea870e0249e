use std::fmt;

/// A wrapper for request data that has not been validated yet.
///
/// Request bodies, path segments and headers enter the crate as `Tainted<T>`.
/// The only way to get at the value is through a sanitizer in
/// [`sanitizer`](crate::sanitizer), which either rejects it with field-level
/// errors or promotes it to [`Verified<T>`](crate::Verified).
///
/// # Security Properties
///
/// - Does NOT implement `Deref` or any implicit conversion traits
/// - Inner value is inaccessible outside the crate
///
/// # Examples
///
/// ```
/// use accounts_core::Tainted;
///
/// let username = Tainted::new("jerry\n".to_string());
///
/// // Debug output shows it's tainted
/// assert!(format!("{:?}", username).starts_with("Tainted"));
///
/// // But the value cannot be used directly:
/// // let s: String = username; // Won't compile!
/// ```
// Clone is required: create and update validation may both look at one payload.
#[derive(Clone)]
pub struct Tainted<T> {
    // Must remain private (CWE-20): external code goes through a sanitizer.
    inner: T,
}

impl<T> Tainted<T> {
    /// Wraps an untrusted value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Extracts the inner value for sanitization.
    ///
    /// `pub(crate)`: only sanitizers may call this, and only on the way to
    /// producing a `Verified<T>` or an error.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

// Do NOT add Deref, AsRef, Borrow, From<T>, Into<T> or other implicit
// conversions: they would let unvalidated input reach the repository.

impl<T: fmt::Debug> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tainted")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tainted_wraps_value() {
        let user_input = Tainted::new("robert'); DROP TABLE users;--".to_string());
        let debug_output = format!("{:?}", user_input);

        assert!(debug_output.contains("Tainted"));
        assert!(debug_output.contains("DROP TABLE"));
    }

    #[test]
    fn tainted_into_inner_is_crate_visible() {
        let tainted = Tainted::new(42);
        assert_eq!(tainted.into_inner(), 42);
    }

    mod proptests {
        use super::*;
        use crate::sanitizer::{Sanitizer, StringSanitizer};
        use crate::test_utils::arb_valid_string;
        use proptest::prelude::*;

        proptest! {
            /// Cloning a Tainted value yields identical sanitization outcomes.
            #[test]
            fn proptest_tainted_clone_preserves_value(input in arb_valid_string(150)) {
                let sanitizer = StringSanitizer::new(150);

                let tainted1 = Tainted::new(input.clone());
                let tainted2 = tainted1.clone();

                let verified1 = sanitizer.sanitize(tainted1).expect("valid input should pass");
                let verified2 = sanitizer.sanitize(tainted2).expect("valid input should pass");

                prop_assert_eq!(verified1.as_ref(), verified2.as_ref());
                prop_assert_eq!(verified1.as_ref(), &input);
            }
        }
    }
}
