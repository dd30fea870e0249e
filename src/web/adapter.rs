//! Framework-agnostic view of an incoming HTTP request.

use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::Tainted;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Owned request data handed to [`AccountsApi::handle`](super::AccountsApi::handle).
///
/// Framework integrations build one from their own request type, or from an
/// `http::Request` through the `From` impl.
///
/// # Examples
///
/// ```
/// use accounts_core::web::RequestAdapter;
/// use http::Method;
/// use serde_json::json;
///
/// let request = RequestAdapter::new(Method::POST, "/api-token-auth/")
///     .with_header("X-Request-Id", "req-42")
///     .with_json(&json!({"username": "jerry", "password": "pw"}));
///
/// assert_eq!(request.request_id(), "req-42");
/// assert_eq!(request.method(), &Method::POST);
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

/// Why a request body could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// The body is not valid JSON.
    Malformed(String),
    /// The body is JSON but not an object.
    NotAnObject(&'static str),
}

impl RequestAdapter {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets `Authorization: Token <key>`.
    pub fn with_token(self, key: &str) -> Self {
        self.with_header(AUTHORIZATION.as_str(), &format!("Token {}", key))
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body.
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.path.split('?').next().unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `X-Request-Id` header if it is usable, otherwise a fresh UUID v4.
    pub fn request_id(&self) -> String {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_REQUEST_ID_LEN
                    && id.chars().all(|c| c.is_ascii_graphic())
            })
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// The raw `Authorization` header, if present and readable.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }

    /// Parses the body as a JSON object into `T`, marked as untrusted.
    ///
    /// A missing or empty body reads as `{}`.
    ///
    /// # Errors
    ///
    /// `BodyError` if the body is not a JSON object of the right shape.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<Tainted<T>, BodyError> {
        let value = match self.body.as_deref() {
            None => Value::Object(Default::default()),
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                Value::Object(Default::default())
            }
            Some(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| BodyError::Malformed(e.to_string()))?,
        };

        if !value.is_object() {
            return Err(BodyError::NotAnObject(json_type(&value)));
        }
        serde_json::from_value(value)
            .map(Tainted::new)
            .map_err(|e| BodyError::Malformed(e.to_string()))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl BodyError {
    /// The 400 body describing this error.
    pub fn to_json(&self) -> Value {
        match self {
            BodyError::Malformed(e) => {
                serde_json::json!({ "detail": format!("JSON parse error - {}", e) })
            }
            BodyError::NotAnObject(found) => {
                let message = format!("Invalid data. Expected a dictionary, but got {}.", found);
                let mut body = serde_json::Map::new();
                body.insert(ValidationErrors::NON_FIELD.to_string(), serde_json::json!([message]));
                Value::Object(body)
            }
        }
    }
}

impl<B: Into<Vec<u8>>> From<http::Request<B>> for RequestAdapter {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        let body: Vec<u8> = body.into();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserInput;
    use serde_json::json;

    #[test]
    fn request_id_comes_from_header() {
        let request = RequestAdapter::new(Method::GET, "/").with_header("X-Request-Id", "abc-1");
        assert_eq!(request.request_id(), "abc-1");
    }

    #[test]
    fn request_id_is_generated_when_missing_or_unusable() {
        let missing = RequestAdapter::new(Method::GET, "/");
        let blank = RequestAdapter::new(Method::GET, "/").with_header("X-Request-Id", "  ");
        let long = RequestAdapter::new(Method::GET, "/")
            .with_header("X-Request-Id", &"a".repeat(MAX_REQUEST_ID_LEN + 1));

        for request in [missing, blank, long] {
            let id = request.request_id();
            assert!(Uuid::parse_str(&id).is_ok(), "not a uuid: {id}");
        }
    }

    #[test]
    fn path_drops_query_string() {
        let request = RequestAdapter::new(Method::GET, "/api/v1/users/?page=2");
        assert_eq!(request.path(), "/api/v1/users/");
    }

    #[test]
    fn with_token_sets_authorization() {
        let request = RequestAdapter::new(Method::GET, "/").with_token("abc");
        assert_eq!(request.authorization(), Some("Token abc"));
    }

    #[test]
    fn invalid_header_is_dropped() {
        let request = RequestAdapter::new(Method::GET, "/").with_header("bad header", "x");
        assert!(request.headers().is_empty());
    }

    #[test]
    fn missing_body_reads_as_empty_object() {
        let request = RequestAdapter::new(Method::PATCH, "/");
        let input = request.json_body::<UserInput>().unwrap().into_inner();
        assert!(input.username.is_none());

        let request = RequestAdapter::new(Method::PATCH, "/").with_body("  \n");
        assert!(request.json_body::<UserInput>().is_ok());
    }

    #[test]
    fn malformed_json_is_reported() {
        let request = RequestAdapter::new(Method::POST, "/").with_body("{\"username\": ");
        let err = request.json_body::<UserInput>().unwrap_err();
        assert!(matches!(err, BodyError::Malformed(_)));

        let body = err.to_json();
        assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error - "));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let request = RequestAdapter::new(Method::POST, "/").with_json(&json!([1, 2]));
        let err = request.json_body::<UserInput>().unwrap_err();
        assert_eq!(err, BodyError::NotAnObject("list"));
        assert_eq!(
            err.to_json(),
            json!({"non_field_errors": ["Invalid data. Expected a dictionary, but got list."]})
        );
    }

    #[test]
    fn converts_from_http_request() {
        let request = http::Request::builder()
            .method(Method::PATCH)
            .uri("http://localhost/api/v1/users/2/?x=1")
            .header("Authorization", "Bearer k")
            .body(b"{}".to_vec())
            .unwrap();

        let adapter = RequestAdapter::from(request);
        assert_eq!(adapter.method(), &Method::PATCH);
        assert_eq!(adapter.path(), "/api/v1/users/2/");
        assert_eq!(adapter.authorization(), Some("Bearer k"));
    }
}
