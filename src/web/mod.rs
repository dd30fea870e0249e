//! HTTP surface, independent of any web framework.
//!
//! A framework integration converts its request into a [`RequestAdapter`],
//! calls [`AccountsApi::handle`] and writes back the [`ApiResponse`]
//! (`ApiResponse::into_http` gives an `http::Response`).
//!
//! Routes, with a default configuration:
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | `POST` | `/api-token-auth/` | login, returns `{"token": ...}` |
//! | `GET` | `/api/v1/users/` | list |
//! | `POST` | `/api/v1/users/` | create (elevated only) |
//! | `GET` | `/api/v1/users/{id}/` | retrieve |
//! | `PATCH` | `/api/v1/users/{id}/` | partial update (self or elevated) |
//! | `DELETE` | `/api/v1/users/{id}/` | delete (self or elevated) |
//!
//! Request bodies are parsed into `Tainted` values here and validated by the
//! service; nothing in this module grants access.

mod adapter;
mod api;
mod response;
mod router;

pub use adapter::{BodyError, RequestAdapter, REQUEST_ID_HEADER};
pub use api::AccountsApi;
pub use response::ApiResponse;
pub use router::{Route, Router};
