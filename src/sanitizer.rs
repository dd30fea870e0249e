//! Field and payload validation.
//!
//! Field sanitizers implement [`Sanitizer`] and turn one `Tainted` value into
//! a `Verified` one or a [`SanitizationError`]. [`UserInputValidator`] runs
//! them over a whole [`UserInput`] and collects every failure into
//! [`ValidationErrors`], keyed by field name.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationErrors;
use crate::model::{NewUser, TextInput, UserChanges, UserInput};
use crate::{Secret, Tainted, Verified};

/// Error returned when a single field fails validation.
///
/// The message is the client-facing text; it never echoes the rejected input.
///
/// # Examples
///
/// ```
/// use accounts_core::{SanitizationError, SanitizationErrorKind};
///
/// let error = SanitizationError::new(SanitizationErrorKind::Empty, "This field may not be blank.");
/// assert_eq!(error.kind(), SanitizationErrorKind::Empty);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationError {
    kind: SanitizationErrorKind,
    message: String,
}

impl SanitizationError {
    /// Creates a new sanitization error.
    pub fn new(kind: SanitizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SanitizationErrorKind {
        self.kind
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SanitizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sanitization failed ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for SanitizationError {}

/// Kind of sanitization error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizationErrorKind {
    /// Input is empty or contains only whitespace.
    Empty,
    /// Input exceeds maximum allowed length.
    TooLong,
    /// Input contains control or non-printable characters.
    ContainsControlChars,
    /// Input contains characters outside the allowed set.
    InvalidCharacters,
    /// Input could not be read as a boolean.
    NotABoolean,
    /// Input was a JSON type other than a string or a number.
    NotAString,
}

impl fmt::Display for SanitizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty input"),
            Self::TooLong => write!(f, "input too long"),
            Self::ContainsControlChars => write!(f, "contains control characters"),
            Self::InvalidCharacters => write!(f, "invalid characters"),
            Self::NotABoolean => write!(f, "not a boolean"),
            Self::NotAString => write!(f, "not a string"),
        }
    }
}

/// Converts a tainted `T` into a verified `U`.
///
/// # Invariants
///
/// Implementations MUST only call `Verified::new_unchecked` after validation
/// succeeds, and MUST NOT include the rejected input in their errors.
pub trait Sanitizer<T, U = T> {
    /// Validates `input`.
    ///
    /// # Errors
    ///
    /// Returns `SanitizationError` if the input fails validation.
    fn sanitize(&self, input: Tainted<T>) -> Result<Verified<U>, SanitizationError>;
}

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

fn too_long(max_len: usize) -> SanitizationError {
    SanitizationError::new(
        SanitizationErrorKind::TooLong,
        format!("Ensure this field has no more than {} characters.", max_len),
    )
}

fn text(input: &TextInput) -> Result<&str, SanitizationError> {
    input
        .as_text()
        .ok_or_else(|| SanitizationError::new(SanitizationErrorKind::NotAString, "Not a valid string."))
}

fn is_control_char(c: char) -> bool {
    c.is_control() || c == '\u{007F}'
}

/// A string sanitizer enforcing trimming, a length limit and no control
/// characters.
///
/// Blank input is rejected unless [`allow_blank`](Self::allow_blank) is set,
/// in which case it verifies to the empty string.
///
/// # Examples
///
/// ```
/// use accounts_core::{Tainted, Sanitizer, StringSanitizer};
///
/// let sanitizer = StringSanitizer::new(150);
/// let verified = sanitizer.sanitize(Tainted::new("  Jerry  ".to_string())).unwrap();
/// assert_eq!(verified.as_ref(), "Jerry");
///
/// assert!(sanitizer.sanitize(Tainted::new("   ".to_string())).is_err());
/// assert!(sanitizer.sanitize(Tainted::new("Je\nrry".to_string())).is_err());
///
/// let optional = StringSanitizer::new(150).allow_blank();
/// assert_eq!(optional.sanitize(Tainted::new(" ".to_string())).unwrap().as_ref(), "");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StringSanitizer {
    max_len: usize,
    allow_blank: bool,
}

impl StringSanitizer {
    /// Creates a sanitizer with the given maximum length in characters.
    ///
    /// # Panics
    ///
    /// Panics if `max_len` is 0.
    pub fn new(max_len: usize) -> Self {
        assert!(max_len > 0, "max_len must be greater than 0");
        Self {
            max_len,
            allow_blank: false,
        }
    }

    /// Accepts blank input as the empty string.
    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    fn check(&self, raw: &str) -> Result<String, SanitizationError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            if self.allow_blank {
                return Ok(String::new());
            }
            return Err(SanitizationError::new(SanitizationErrorKind::Empty, BLANK));
        }

        if trimmed.chars().any(is_control_char) {
            return Err(SanitizationError::new(
                SanitizationErrorKind::ContainsControlChars,
                "This field may not contain control characters.",
            ));
        }

        if trimmed.chars().count() > self.max_len {
            return Err(too_long(self.max_len));
        }

        Ok(trimmed.to_string())
    }
}

impl Sanitizer<String> for StringSanitizer {
    fn sanitize(&self, input: Tainted<String>) -> Result<Verified<String>, SanitizationError> {
        let raw = input.into_inner();
        self.check(&raw).map(Verified::new_unchecked)
    }
}

impl Sanitizer<TextInput, String> for StringSanitizer {
    fn sanitize(&self, input: Tainted<TextInput>) -> Result<Verified<String>, SanitizationError> {
        let raw = input.into_inner();
        self.check(text(&raw)?).map(Verified::new_unchecked)
    }
}

/// Usernames: a required string of letters, digits and `@ . + - _`.
#[derive(Debug, Clone, Copy)]
pub struct UsernameSanitizer {
    inner: StringSanitizer,
}

impl UsernameSanitizer {
    /// Creates a username sanitizer with the given maximum length.
    pub fn new(max_len: usize) -> Self {
        Self {
            inner: StringSanitizer::new(max_len),
        }
    }

    fn is_allowed(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
    }

    fn check(&self, raw: &str) -> Result<String, SanitizationError> {
        let name = self.inner.check(raw)?;
        if !name.chars().all(Self::is_allowed) {
            return Err(SanitizationError::new(
                SanitizationErrorKind::InvalidCharacters,
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            ));
        }
        Ok(name)
    }
}

impl Sanitizer<String> for UsernameSanitizer {
    fn sanitize(&self, input: Tainted<String>) -> Result<Verified<String>, SanitizationError> {
        self.check(&input.into_inner()).map(Verified::new_unchecked)
    }
}

impl Sanitizer<TextInput, String> for UsernameSanitizer {
    fn sanitize(&self, input: Tainted<TextInput>) -> Result<Verified<String>, SanitizationError> {
        let raw = input.into_inner();
        self.check(text(&raw)?).map(Verified::new_unchecked)
    }
}

/// Passwords: non-blank, length-limited, never trimmed.
#[derive(Debug, Clone, Copy)]
pub struct PasswordSanitizer {
    max_len: usize,
}

impl PasswordSanitizer {
    /// Creates a password sanitizer with the given maximum length.
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    fn check(&self, raw: &str) -> Result<(), SanitizationError> {
        if raw.trim().is_empty() {
            return Err(SanitizationError::new(SanitizationErrorKind::Empty, BLANK));
        }
        if raw.chars().count() > self.max_len {
            return Err(too_long(self.max_len));
        }
        Ok(())
    }
}

impl Sanitizer<Secret<String>> for PasswordSanitizer {
    fn sanitize(
        &self,
        input: Tainted<Secret<String>>,
    ) -> Result<Verified<Secret<String>>, SanitizationError> {
        let password = input.into_inner();
        self.check(password.expose_secret())?;
        Ok(Verified::new_unchecked(password))
    }
}

impl Sanitizer<Secret<TextInput>, Secret<String>> for PasswordSanitizer {
    fn sanitize(
        &self,
        input: Tainted<Secret<TextInput>>,
    ) -> Result<Verified<Secret<String>>, SanitizationError> {
        let password = input.into_inner();
        let raw = text(password.expose_secret())?;
        self.check(raw)?;
        // The received copy is zeroized when `password` drops.
        Ok(Verified::new_unchecked(Secret::new(raw.to_string())))
    }
}

/// Reads JSON booleans and the form-style strings clients send for them.
///
/// Accepted (case-insensitive): `true/false`, `1/0`, `yes/no`, `y/n`,
/// `on/off`, `t/f`, and the numbers `1` and `0`.
///
/// # Examples
///
/// ```
/// use accounts_core::{BooleanSanitizer, Sanitizer, Tainted};
/// use serde_json::json;
///
/// let verified = BooleanSanitizer.sanitize(Tainted::new(json!("False"))).unwrap();
/// assert!(!*verified.as_ref());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BooleanSanitizer;

impl Sanitizer<Value, bool> for BooleanSanitizer {
    fn sanitize(&self, input: Tainted<Value>) -> Result<Verified<bool>, SanitizationError> {
        let parsed = match input.into_inner() {
            Value::Bool(b) => Some(b),
            Value::Number(n) => match n.as_u64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
                "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        };

        parsed.map(Verified::new_unchecked).ok_or_else(|| {
            SanitizationError::new(SanitizationErrorKind::NotABoolean, "Must be a valid boolean.")
        })
    }
}

/// Length limits applied to user fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    /// Maximum username length
    pub username_max_len: usize,
    /// Maximum first/last name length
    pub name_max_len: usize,
    /// Maximum plain-text password length
    pub password_max_len: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            username_max_len: 150,
            name_max_len: 150,
            password_max_len: 128,
        }
    }
}

/// Validates whole user payloads for creation and partial update.
///
/// Every field is checked; all failures are reported together.
#[derive(Debug, Clone, Copy)]
pub struct UserInputValidator {
    username: UsernameSanitizer,
    name: StringSanitizer,
    password: PasswordSanitizer,
}

impl UserInputValidator {
    /// Creates a validator using the given limits.
    pub fn new(limits: FieldLimits) -> Self {
        Self {
            username: UsernameSanitizer::new(limits.username_max_len),
            name: StringSanitizer::new(limits.name_max_len).allow_blank(),
            password: PasswordSanitizer::new(limits.password_max_len),
        }
    }

    /// Validates a creation payload.
    ///
    /// `username`, `password` and `is_active` are required; names default to
    /// blank.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate_create(
        &self,
        input: Tainted<UserInput>,
    ) -> Result<Verified<NewUser>, ValidationErrors> {
        let input = input.into_inner();
        let mut errors = ValidationErrors::new();

        let username = required(&mut errors, "username", input.username, &self.username);
        let first_name = optional(&mut errors, "first_name", input.first_name, &self.name);
        let last_name = optional(&mut errors, "last_name", input.last_name, &self.name);
        let password = required(&mut errors, "password", input.password, &self.password);
        let is_active = required(&mut errors, "is_active", input.is_active, &BooleanSanitizer);

        errors.into_result()?;

        match (username, password, is_active) {
            (Some(username), Some(password), Some(is_active)) => {
                Ok(Verified::new_unchecked(NewUser {
                    username,
                    first_name: first_name.unwrap_or_default(),
                    last_name: last_name.unwrap_or_default(),
                    password,
                    is_active,
                }))
            }
            // Unreachable: a missing required field always records an error.
            _ => Err(ValidationErrors::single(ValidationErrors::NON_FIELD, REQUIRED)),
        }
    }

    /// Validates a partial update: every field is optional, supplied ones
    /// must be valid.
    ///
    /// # Errors
    ///
    /// Returns every field error found.
    pub fn validate_update(
        &self,
        input: Tainted<UserInput>,
    ) -> Result<Verified<UserChanges>, ValidationErrors> {
        let input = input.into_inner();
        let mut errors = ValidationErrors::new();

        let changes = UserChanges {
            username: optional(&mut errors, "username", input.username, &self.username),
            first_name: optional(&mut errors, "first_name", input.first_name, &self.name),
            last_name: optional(&mut errors, "last_name", input.last_name, &self.name),
            password: optional(&mut errors, "password", input.password, &self.password),
            is_active: optional(&mut errors, "is_active", input.is_active, &BooleanSanitizer),
        };

        errors.into_result()?;
        Ok(Verified::new_unchecked(changes))
    }
}

/// Sanitizes a field that must be present.
pub(crate) fn required<T, U>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<T>,
    sanitizer: &impl Sanitizer<T, U>,
) -> Option<U> {
    match value {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        some => optional(errors, field, some, sanitizer),
    }
}

/// Sanitizes a field that may be absent.
pub(crate) fn optional<T, U>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<T>,
    sanitizer: &impl Sanitizer<T, U>,
) -> Option<U> {
    let value = value?;
    match sanitizer.sanitize(Tainted::new(value)) {
        Ok(verified) => Some(verified.into_inner()),
        Err(e) => {
            errors.add(field, e.message());
            None
        }
    }
}
