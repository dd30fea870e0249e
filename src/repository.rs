//! User persistence.
//!
//! [`UserRepository`] is the storage contract the service layer works
//! against. [`InMemoryUserRepository`] implements it over a `BTreeMap` so
//! listings come back ordered by id.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Result, ValidationErrors};
use crate::model::{User, UserDraft, UserId, UserPatch};

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Storage contract for user records.
///
/// Implementations must keep usernames unique: `create` and `update` reject
/// a username held by another record with a `username` validation error.
pub trait UserRepository: Send + Sync {
    /// Inserts a new record, assigning its id and `date_joined`.
    ///
    /// # Errors
    ///
    /// `Error::Validation` if the username is taken.
    fn create(&self, draft: UserDraft) -> Result<User>;

    /// Fetches a record by id.
    fn get(&self, id: UserId) -> Option<User>;

    /// Fetches a record by exact username.
    fn find_by_username(&self, username: &str) -> Option<User>;

    /// All records, ordered by id.
    fn list(&self) -> Vec<User>;

    /// Applies `patch` to the record with `id` and returns the result.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if there is no such record, `Error::Validation` if
    /// the patch renames it to a username held by another record.
    fn update(&self, id: UserId, patch: UserPatch) -> Result<User>;

    /// Removes a record. Returns false if it did not exist.
    fn delete(&self, id: UserId) -> bool;
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    last_id: u64,
}

impl Inner {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// `UserRepository` backed by process memory.
///
/// Ids start at 1 and are never reused, even after deletion.
///
/// # Examples
///
/// ```
/// use accounts_core::{InMemoryUserRepository, PasswordHash, UserDraft, UserRepository};
///
/// let repo = InMemoryUserRepository::new();
/// let user = repo
///     .create(UserDraft {
///         username: "tom".into(),
///         first_name: String::new(),
///         last_name: String::new(),
///         email: String::new(),
///         password_hash: PasswordHash::from_phc("$argon2id$v=19$stub"),
///         is_active: true,
///         is_superuser: false,
///     })
///     .unwrap();
///
/// assert_eq!(user.id.0, 1);
/// assert!(repo.find_by_username("tom").is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Inner>,
}

impl InMemoryUserRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().users.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().users.is_empty()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn create(&self, draft: UserDraft) -> Result<User> {
        let mut inner = self.inner.write();
        if inner.username_taken(&draft.username, None) {
            return Err(ValidationErrors::single("username", DUPLICATE_USERNAME).into());
        }

        inner.last_id += 1;
        let user = User {
            id: UserId(inner.last_id),
            username: draft.username,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            password_hash: draft.password_hash,
            is_active: draft.is_active,
            is_superuser: draft.is_superuser,
            last_login: None,
            date_joined: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "user record created");
        Ok(user)
    }

    fn get(&self, id: UserId) -> Option<User> {
        self.inner.read().users.get(&id).cloned()
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    fn list(&self) -> Vec<User> {
        self.inner.read().users.values().cloned().collect()
    }

    fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let mut inner = self.inner.write();
        if let Some(username) = patch.username.as_deref() {
            if inner.username_taken(username, Some(id)) {
                return Err(ValidationErrors::single("username", DUPLICATE_USERNAME).into());
            }
        }

        let user = inner.users.get_mut(&id).ok_or(crate::Error::NotFound)?;
        patch.apply(user);
        tracing::debug!(user_id = %id, "user record updated");
        Ok(user.clone())
    }

    fn delete(&self, id: UserId) -> bool {
        let removed = self.inner.write().users.remove(&id).is_some();
        if removed {
            tracing::debug!(user_id = %id, "user record deleted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordHash;
    use crate::Error;

    fn draft(username: &str) -> UserDraft {
        UserDraft {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: PasswordHash::from_phc("$argon2id$v=19$stub"),
            is_active: true,
            is_superuser: false,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let repo = InMemoryUserRepository::new();
        assert_eq!(repo.create(draft("jerry")).unwrap().id, UserId(1));
        assert_eq!(repo.create(draft("tom")).unwrap().id, UserId(2));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(draft("jerry")).unwrap();
        assert!(repo.delete(first.id));
        assert_eq!(repo.create(draft("tom")).unwrap().id, UserId(2));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(draft("jerry")).unwrap();

        match repo.create(draft("jerry")) {
            Err(Error::Validation(errors)) => {
                assert_eq!(
                    errors.get("username"),
                    Some(&[DUPLICATE_USERNAME.to_string()][..])
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn list_is_ordered_by_id() {
        let repo = InMemoryUserRepository::new();
        for name in ["c", "a", "b"] {
            repo.create(draft(name)).unwrap();
        }
        let names: Vec<String> = repo.list().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn update_applies_patch() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(draft("tom")).unwrap();

        let updated = repo
            .update(
                user.id,
                UserPatch {
                    last_name: Some("Cat".into()),
                    ..UserPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.last_name, "Cat");
        assert_eq!(repo.get(user.id).unwrap().last_name, "Cat");
    }

    #[test]
    fn update_may_keep_own_username() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(draft("tom")).unwrap();
        let patch = UserPatch {
            username: Some("tom".into()),
            ..UserPatch::default()
        };
        assert!(repo.update(user.id, patch).is_ok());
    }

    #[test]
    fn update_rejects_taken_username() {
        let repo = InMemoryUserRepository::new();
        repo.create(draft("jerry")).unwrap();
        let tom = repo.create(draft("tom")).unwrap();

        let patch = UserPatch {
            username: Some("jerry".into()),
            ..UserPatch::default()
        };
        assert!(matches!(repo.update(tom.id, patch), Err(Error::Validation(_))));
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let result = repo.update(UserId(9), UserPatch::default());
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn delete_missing_record_returns_false() {
        let repo = InMemoryUserRepository::new();
        assert!(!repo.delete(UserId(1)));
        assert!(repo.is_empty());
    }

    #[test]
    fn find_by_username_is_exact() {
        let repo = InMemoryUserRepository::new();
        repo.create(draft("Tom")).unwrap();
        assert!(repo.find_by_username("Tom").is_some());
        assert!(repo.find_by_username("tom").is_none());
    }
}
