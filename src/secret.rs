use std::fmt;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

/// A wrapper that keeps credential material out of logs and responses.
///
/// `Secret<T>` holds plain-text passwords and token keys. The wrapped value
/// can only be read through the explicit [`expose_secret`](Self::expose_secret)
/// method, and its memory is zeroized when the wrapper is dropped.
///
/// # Security Properties
///
/// - Does NOT implement `Deref`, `AsRef`, `Borrow`, `Clone`, `Copy` or `Serialize`
/// - Debug and Display output is always `[REDACTED]`
/// - No type information is leaked in formatted output
/// - Deserializes transparently, so request bodies never hold a bare password
///
/// # Examples
///
/// ```
/// use accounts_core::Secret;
///
/// let password = Secret::new("A12345a!".to_string());
///
/// assert_eq!(format!("{:?}", password), "[REDACTED]");
/// assert_eq!(format!("{}", password), "[REDACTED]");
///
/// assert_eq!(password.expose_secret(), "A12345a!");
/// ```
// Do NOT add Clone, Copy, Default or Serialize derives: each one is a path for
// credential material to be duplicated or written out without redaction.
pub struct Secret<T: Zeroize> {
    // Must remain private (CWE-532).
    inner: T,
}

impl<T: Zeroize> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// # Security Warning
    ///
    /// Callers must not log, format, or store the returned reference.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    /// MUST unconditionally return "[REDACTED]".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    /// MUST unconditionally return "[REDACTED]".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de, T> Deserialize<'de> for Secret<T>
where
    T: Zeroize + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Secret::new)
    }
}
