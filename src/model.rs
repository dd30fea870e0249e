//! User records and the data shapes exposed over the API.
//!
//! A [`User`] is the stored record. It is never serialized directly:
//! responses go through [`UserOutput`] (seven safe fields) and request bodies
//! arrive as [`UserInput`] (the writable fields only). Validation turns a
//! tainted `UserInput` into a [`NewUser`] or [`UserChanges`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::password::PasswordHash;
use crate::secret::Secret;

/// Identifier of a stored user. Allocated by the repository, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(UserId)
    }
}

/// A stored user account.
#[derive(Debug, Clone)]
pub struct User {
    /// Repository-assigned identifier
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// Given name, may be blank
    pub first_name: String,
    /// Family name, may be blank
    pub last_name: String,
    /// Contact address, may be blank; not part of any API shape
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: PasswordHash,
    /// Inactive accounts cannot log in or authenticate
    pub is_active: bool,
    /// Elevated privilege: bypasses ownership checks
    pub is_superuser: bool,
    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,
    /// Creation time
    pub date_joined: DateTime<Utc>,
}

/// The read shape of a user: exactly the fields safe to expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOutput {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub is_superuser: bool,
}

impl From<&User> for UserOutput {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: user.is_active,
            last_login: user.last_login,
            is_superuser: user.is_superuser,
        }
    }
}

/// A text field as received.
///
/// Numbers are accepted and read as their decimal text. Any other JSON type
/// is kept as [`WrongType`](Self::WrongType) so validation can report it
/// against the field instead of failing the whole body. `null` deserializes
/// to a missing field through the surrounding `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    Text(String),
    WrongType,
}

impl TextInput {
    /// The text, if the field held a string or a number.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextInput::Text(text) => Some(text),
            TextInput::WrongType => None,
        }
    }
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        TextInput::Text(text.to_string())
    }
}

impl From<String> for TextInput {
    fn from(text: String) -> Self {
        TextInput::Text(text)
    }
}

impl<'de> Deserialize<'de> for TextInput {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => TextInput::Text(text),
            serde_json::Value::Number(n) => TextInput::Text(n.to_string()),
            _ => TextInput::WrongType,
        })
    }
}

impl Zeroize for TextInput {
    fn zeroize(&mut self) {
        if let TextInput::Text(text) = self {
            text.zeroize();
        }
    }
}

/// The write shape of a user, as received.
///
/// Every field is optional here; which ones are required depends on whether
/// the payload creates or partially updates a user. Fields outside this shape
/// (`id`, `is_superuser`, ...) are ignored during deserialization.
///
/// `is_active` is kept as a raw JSON value because clients send both booleans
/// and form-style strings such as `"False"`.
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub username: Option<TextInput>,
    #[serde(default)]
    pub first_name: Option<TextInput>,
    #[serde(default)]
    pub last_name: Option<TextInput>,
    #[serde(default)]
    pub password: Option<Secret<TextInput>>,
    #[serde(default)]
    pub is_active: Option<serde_json::Value>,
}

/// A validated creation payload. The password is still plain text; the
/// service hashes it before anything is stored.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Secret<String>,
    pub is_active: bool,
}

/// A validated partial update. `None` leaves the field untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<Secret<String>>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    /// Returns true if the update touches no field.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }
}

/// Stored-field changes handed to the repository. Unlike [`UserChanges`] the
/// password is already hashed, and login bookkeeping can be set.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<PasswordHash>,
    pub is_active: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserPatch {
    /// Applies the supplied fields to `user`.
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(last_login) = self.last_login {
            user.last_login = Some(last_login);
        }
    }
}

/// Fields needed to insert a user; the repository assigns `id` and
/// `date_joined`.
#[derive(Debug)]
pub struct UserDraft {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub is_active: bool,
    pub is_superuser: bool,
}
