//! Login credentials.
//!
//! A token is an opaque key bound to exactly one user. Issuing is
//! get-or-create, so logging in twice hands back the same key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use zeroize::Zeroize;

use crate::model::UserId;
use crate::secret::Secret;

/// Random bytes per key; rendered as twice as many hex characters.
const KEY_BYTES: usize = 20;

/// An issued credential.
#[derive(Debug)]
pub struct Token {
    /// The bearer key, 40 lowercase hex characters
    pub key: Secret<String>,
    /// The user this key authenticates as
    pub user_id: UserId,
    /// When the key was first issued
    pub created: DateTime<Utc>,
}

/// Storage contract for credentials.
///
/// At most one key exists per user at any time.
pub trait TokenStore: Send + Sync {
    /// Returns the user's key, creating one if none exists.
    fn get_or_create(&self, user_id: UserId) -> Token;

    /// Resolves a presented key to its user.
    fn resolve(&self, key: &str) -> Option<UserId>;

    /// Drops the user's key. Returns false if there was none.
    fn revoke(&self, user_id: UserId) -> bool;
}

#[derive(Debug, Clone)]
struct Issued {
    key: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    by_user: HashMap<UserId, Issued>,
    by_key: HashMap<String, UserId>,
}

/// `TokenStore` backed by process memory.
///
/// # Examples
///
/// ```
/// use accounts_core::{InMemoryTokenStore, TokenStore, UserId};
///
/// let store = InMemoryTokenStore::new();
/// let first = store.get_or_create(UserId(1));
/// let again = store.get_or_create(UserId(1));
///
/// assert_eq!(first.key.expose_secret(), again.key.expose_secret());
/// assert_eq!(store.resolve(first.key.expose_secret()), Some(UserId(1)));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<Inner>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let key = hex::encode(bytes);
    bytes.zeroize();
    key
}

impl TokenStore for InMemoryTokenStore {
    fn get_or_create(&self, user_id: UserId) -> Token {
        let mut inner = self.inner.write();
        if let Some(issued) = inner.by_user.get(&user_id) {
            return Token {
                key: Secret::new(issued.key.clone()),
                user_id,
                created: issued.created,
            };
        }

        let mut key = generate_key();
        while inner.by_key.contains_key(&key) {
            key = generate_key();
        }
        let issued = Issued {
            key,
            created: Utc::now(),
        };
        inner.by_key.insert(issued.key.clone(), user_id);
        inner.by_user.insert(user_id, issued.clone());
        tracing::debug!(user_id = %user_id, "token issued");

        Token {
            key: Secret::new(issued.key),
            user_id,
            created: issued.created,
        }
    }

    fn resolve(&self, key: &str) -> Option<UserId> {
        self.inner.read().by_key.get(key).copied()
    }

    fn revoke(&self, user_id: UserId) -> bool {
        let mut inner = self.inner.write();
        match inner.by_user.remove(&user_id) {
            Some(issued) => {
                inner.by_key.remove(&issued.key);
                tracing::debug!(user_id = %user_id, "token revoked");
                true
            }
            None => false,
        }
    }
}
