//! Credential resolution and login.
//!
//! [`Authenticator::resolve`] turns an `Authorization` header into the acting
//! principal. [`Authenticator::login`] checks a username/password pair and
//! issues the user's token.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::audit::{AuditEvent, AuditEventKind, AuditLog, AuditOutcome};
use crate::config::Config;
use crate::error::{Error, Result, ValidationErrors};
use crate::model::{TextInput, UserPatch};
use crate::password::{PasswordHash, PasswordHasher};
use crate::repository::UserRepository;
use crate::request::Principal;
use crate::sanitizer::{self, PasswordSanitizer, StringSanitizer};
use crate::token::{Token, TokenStore};
use crate::{Secret, Tainted};

const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
const SPACES_IN_KEY: &str = "Invalid token header. Token string should not contain spaces.";
const INVALID_TOKEN: &str = "Invalid token.";
const INACTIVE_USER: &str = "User inactive or deleted.";
const DECOY_PASSWORD: &str = "decoy password for unknown usernames";

/// Login payload as received.
#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: Option<TextInput>,
    #[serde(default)]
    pub password: Option<Secret<TextInput>>,
}

/// Resolves credentials and issues tokens.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    hasher: PasswordHasher,
    // Verified against when the username is unknown, so both paths pay for
    // one Argon2 run.
    decoy: PasswordHash,
    keywords: Vec<String>,
    username: StringSanitizer,
    password: PasswordSanitizer,
    audit: AuditLog,
}

impl Authenticator {
    /// Builds an authenticator over the given stores.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the configuration fails validation or the hashing
    /// parameters are invalid.
    pub fn new(
        config: &Config,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        audit: AuditLog,
    ) -> Result<Self> {
        config.validate()?;
        let hasher = PasswordHasher::new(config.hashing)?;
        let decoy = hasher.hash(DECOY_PASSWORD)?;
        Ok(Self {
            users,
            tokens,
            hasher,
            decoy,
            keywords: config.auth_keywords.clone(),
            username: StringSanitizer::new(config.limits.username_max_len),
            password: PasswordSanitizer::new(config.limits.password_max_len),
            audit,
        })
    }

    /// Resolves the `Authorization` header to the acting principal.
    ///
    /// No header, or a header with an unrecognised keyword, is anonymous
    /// (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// `Error::Authentication` when the header names an accepted keyword but
    /// the key is missing, malformed or unknown, or its user is inactive.
    pub fn resolve(&self, request_id: &str, header: Option<&str>) -> Result<Option<Principal>> {
        let Some(header) = header else {
            return Ok(None);
        };
        let mut parts = header.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Ok(None);
        };
        if !self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            return Ok(None);
        }

        let key = match (parts.next(), parts.next()) {
            (None, _) => return Err(self.reject(request_id, NO_CREDENTIALS)),
            (Some(_), Some(_)) => return Err(self.reject(request_id, SPACES_IN_KEY)),
            (Some(key), None) => key,
        };

        let user_id = self
            .tokens
            .resolve(key)
            .ok_or_else(|| self.reject(request_id, INVALID_TOKEN))?;
        let user = match self.users.get(user_id) {
            Some(user) if user.is_active => user,
            _ => return Err(self.reject(request_id, INACTIVE_USER)),
        };

        tracing::debug!(request_id = %request_id, user_id = %user.id, "credential resolved");
        Ok(Some(Principal::from_user(&user)))
    }

    fn reject(&self, request_id: &str, reason: &'static str) -> Error {
        tracing::info!(request_id = %request_id, reason, "credential rejected");
        self.audit.emit(
            AuditEvent::new(
                request_id,
                None::<String>,
                AuditEventKind::Authentication,
                AuditOutcome::Denied,
            )
            .with_action("authenticate"),
        );
        Error::Authentication(reason.to_string())
    }

    /// Checks credentials and returns the user's token, issuing one if the
    /// user has none. Sets `last_login` on success.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when a field is missing or blank, and
    /// `Error::InvalidCredentials` for an unknown username, a wrong password
    /// or an inactive account.
    pub fn login(&self, request_id: &str, input: Tainted<LoginInput>) -> Result<Token> {
        let input = input.into_inner();
        let attempted = input
            .username
            .as_ref()
            .and_then(TextInput::as_text)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let mut errors = ValidationErrors::new();
        let username = sanitizer::required(&mut errors, "username", input.username, &self.username);
        let password = sanitizer::required(&mut errors, "password", input.password, &self.password);
        if let Err(errors) = errors.into_result() {
            self.login_denied(request_id, attempted.as_deref());
            return Err(errors.into());
        }
        let (Some(username), Some(password)) = (username, password) else {
            self.login_denied(request_id, attempted.as_deref());
            return Err(Error::InvalidCredentials);
        };

        let Some(user) = self.users.find_by_username(&username) else {
            // The outcome is ignored; only the cost matters.
            let _ = self.hasher.verify(password.expose_secret(), &self.decoy);
            self.login_denied(request_id, Some(&username));
            return Err(Error::InvalidCredentials);
        };
        let matches = match self.hasher.verify(password.expose_secret(), &user.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(request_id = %request_id, user_id = %user.id, error = %e, "stored password hash is unreadable");
                self.audit.emit(
                    AuditEvent::new(
                        request_id,
                        Some(username.as_str()),
                        AuditEventKind::Authentication,
                        AuditOutcome::Error,
                    )
                    .with_action("login")
                    .with_target(user.id),
                );
                return Err(e);
            }
        };
        if !matches || !user.is_active {
            self.login_denied(request_id, Some(&username));
            return Err(Error::InvalidCredentials);
        }

        // Fails if the user was deleted meanwhile; no token is issued then.
        self.users.update(
            user.id,
            UserPatch {
                last_login: Some(Utc::now()),
                ..UserPatch::default()
            },
        )?;
        let token = self.tokens.get_or_create(user.id);

        tracing::info!(request_id = %request_id, user_id = %user.id, "login succeeded");
        self.audit.emit(
            AuditEvent::new(
                request_id,
                Some(username),
                AuditEventKind::Authentication,
                AuditOutcome::Success,
            )
            .with_action("login")
            .with_target(user.id),
        );
        Ok(token)
    }

    fn login_denied(&self, request_id: &str, username: Option<&str>) {
        tracing::info!(request_id = %request_id, username = username.unwrap_or("-"), "login failed");
        self.audit.emit(
            AuditEvent::new(
                request_id,
                username,
                AuditEventKind::Authentication,
                AuditOutcome::Denied,
            )
            .with_action("login"),
        );
    }
}
