//! Mapping results and errors to HTTP responses.

use http::header::{HeaderValue, ALLOW, CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, ValidationErrors};

const NOT_FOUND: &str = "Not found.";
const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
const INTERNAL: &str = "Internal server error.";

/// A response ready to be written by the framework integration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiResponse {
    /// A JSON response.
    pub fn json(status: StatusCode, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Some(body),
        }
    }

    /// 200 with `value` serialized as the body.
    ///
    /// Falls back to a 500 if `value` cannot be serialized.
    pub fn ok(value: &impl Serialize) -> Self {
        Self::serialized(StatusCode::OK, value)
    }

    /// 201 with `value` serialized as the body.
    pub fn created(value: &impl Serialize) -> Self {
        Self::serialized(StatusCode::CREATED, value)
    }

    fn serialized(status: StatusCode, value: &impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::json(status, body),
            Err(e) => {
                tracing::error!(error = %e, "response serialization failed");
                Self::detail(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
            }
        }
    }

    /// 204 without a body.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// `{"detail": message}` with `status`.
    pub fn detail(status: StatusCode, message: &str) -> Self {
        Self::json(status, json!({ "detail": message }))
    }

    pub fn not_found() -> Self {
        Self::detail(StatusCode::NOT_FOUND, NOT_FOUND)
    }

    /// 405 listing the methods the route accepts.
    pub fn method_not_allowed(method: &Method, allowed: &[Method]) -> Self {
        let mut response = Self::detail(
            StatusCode::METHOD_NOT_ALLOWED,
            &format!("Method \"{}\" not allowed.", method),
        );
        response.set_allow(allowed);
        response
    }

    /// 200 answering an `OPTIONS` request.
    pub fn options(allowed: &[Method]) -> Self {
        let mut response = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        };
        response.set_allow(allowed);
        response
    }

    fn set_allow(&mut self, allowed: &[Method]) {
        let list = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = HeaderValue::from_str(&list) {
            self.headers.insert(ALLOW, value);
        }
    }

    /// Maps a crate error to its response.
    ///
    /// 401 responses carry `WWW-Authenticate: <keyword>`. Internal failures
    /// are logged and answered with a generic 500 body.
    pub fn from_error(error: &Error, auth_keyword: &str) -> Self {
        let status = error.status();
        let mut response = match error {
            Error::Violation(v) => Self::detail(status, &v.message),
            Error::Authentication(message) => Self::detail(status, message),
            Error::Validation(errors) => Self::json(status, validation_body(errors)),
            Error::InvalidCredentials => Self::json(
                status,
                json!({ "non_field_errors": [INVALID_CREDENTIALS] }),
            ),
            Error::NotFound => Self::not_found(),
            Error::PasswordHash(_) | Error::Config(_) => {
                tracing::error!(error = %error, "internal error while serving request");
                Self::detail(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
            }
        };

        if response.status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = HeaderValue::from_str(auth_keyword) {
                response.headers.insert(WWW_AUTHENTICATE, value);
            }
        }
        response
    }

    /// Removes the body, keeping status and headers. Used for `HEAD`.
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Converts into an `http::Response` with a serialized JSON body.
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let body = self
            .body
            .map(|v| v.to_string().into_bytes())
            .unwrap_or_default();
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn validation_body(errors: &ValidationErrors) -> Value {
    let fields: Map<String, Value> = errors
        .iter()
        .map(|(field, messages)| (field.to_string(), json!(messages)))
        .collect();
    Value::Object(fields)
}
