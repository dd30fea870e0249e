//! User accounts with token login and self-or-admin authorization.
//!
//! The crate is built around a small, pure authorization policy:
//!
//! - safe methods (`GET`, `HEAD`, `OPTIONS`) are open to everyone
//! - creating users requires an elevated principal
//! - changing or deleting a user requires being that user or elevated
//!
//! Anonymous denials are reported as 401, authenticated ones as 403.
//!
//! # Core Types
//!
//! - [`PolicyGate`]: applies the policy and turns `Ctx<Unchecked>` into
//!   `Ctx<Permitted>`
//! - [`UserService`]: list, retrieve, create, partial update and delete
//! - [`Authenticator`]: resolves `Authorization` headers and issues tokens
//! - [`Tainted<T>`] / [`Verified<T>`]: request data before and after validation
//! - [`Secret<T>`]: redacts passwords and token keys in logs
//! - [`web::AccountsApi`]: framework-agnostic HTTP surface
//!
//! # Examples
//!
//! ```
//! use accounts_core::{Ctx, PolicyGate, Principal, RequestMeta, UserId, ViolationKind};
//! use http::Method;
//!
//! let tom = Principal {
//!     id: UserId(2),
//!     username: "tom".to_string(),
//!     is_superuser: false,
//! };
//!
//! // Reads are open.
//! let ctx = Ctx::new(&RequestMeta::anonymous("req-1"), Method::GET);
//! assert!(PolicyGate::new(ctx).build().is_ok());
//!
//! // Creating users is not.
//! let ctx = Ctx::new(&RequestMeta::authenticated("req-2", tom), Method::POST);
//! let denied = PolicyGate::new(ctx).build().unwrap_err();
//! assert_eq!(denied.kind, ViolationKind::Forbidden { action: "create" });
//! ```

#![forbid(unsafe_code)]

pub mod audit;
mod auth;
mod config;
mod context;
mod error;
mod gate;
mod logging;
mod model;
mod password;
pub mod policy;
mod repository;
mod request;
mod sanitizer;
mod secret;
mod service;
mod state;
mod tainted;
mod token;
mod verified;
pub mod web;

pub use auth::{Authenticator, LoginInput};
pub use config::Config;
pub use context::Ctx;
pub use error::{Error, Result, ValidationErrors, Violation, ViolationKind};
pub use gate::PolicyGate;
pub use logging::RequestLog;
pub use model::{
    NewUser, TextInput, User, UserChanges, UserDraft, UserId, UserInput, UserOutput, UserPatch,
};
pub use password::{HashingParams, PasswordHash, PasswordHasher};
pub use policy::{Decision, DenyReason};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use request::{Principal, RequestMeta};
pub use sanitizer::{
    BooleanSanitizer, FieldLimits, PasswordSanitizer, SanitizationError, SanitizationErrorKind,
    Sanitizer, StringSanitizer, UserInputValidator, UsernameSanitizer,
};
pub use secret::Secret;
pub use service::UserService;
pub use state::{Permitted, Unchecked};
pub use tainted::Tainted;
pub use token::{InMemoryTokenStore, Token, TokenStore};
pub use verified::Verified;
