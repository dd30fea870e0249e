use std::sync::Arc;

use http::{Method, StatusCode};
use serde::Serialize;

use crate::audit::AuditLog;
use crate::auth::{Authenticator, LoginInput};
use crate::config::Config;
use crate::error::Result;
use crate::model::{UserId, UserInput};
use crate::repository::{InMemoryUserRepository, UserRepository};
use crate::request::RequestMeta;
use crate::service::UserService;
use crate::token::{InMemoryTokenStore, TokenStore};

use super::{ApiResponse, RequestAdapter, Route, Router};

/// Body of a successful login.
#[derive(Debug, Serialize)]
struct TokenBody<'a> {
    token: &'a str,
}

/// The accounts HTTP surface: routing, credential resolution and dispatch to
/// the user service.
///
/// # Examples
///
/// ```
/// use accounts_core::web::{AccountsApi, RequestAdapter};
/// use accounts_core::{Config, Secret};
/// use http::{Method, StatusCode};
/// use serde_json::json;
///
/// let api = AccountsApi::new(Config::for_testing()).unwrap();
/// api.users()
///     .create_superuser("jerry", Secret::new("pw1234".to_string()))
///     .unwrap();
///
/// let login = api.handle(
///     &RequestAdapter::new(Method::POST, "/api-token-auth/")
///         .with_json(&json!({"username": "jerry", "password": "pw1234"})),
/// );
/// assert_eq!(login.status, StatusCode::OK);
///
/// let list = api.handle(&RequestAdapter::new(Method::GET, "/api/v1/users/"));
/// assert_eq!(list.body.unwrap().as_array().unwrap().len(), 1);
/// ```
pub struct AccountsApi {
    router: Router,
    auth: Authenticator,
    users: UserService,
    audit: AuditLog,
    challenge: String,
}

impl AccountsApi {
    /// Builds the API over fresh in-memory stores. The audit trail keeps
    /// the last `config.audit_capacity` events.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the configuration is unusable.
    pub fn new(config: Config) -> Result<Self> {
        let audit = AuditLog::with_capacity(config.audit_capacity);
        Self::with_stores(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTokenStore::new()),
            audit,
        )
    }

    /// Builds the API over the given stores.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the configuration is unusable.
    pub fn with_stores(
        config: Config,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        audit: AuditLog,
    ) -> Result<Self> {
        let auth = Authenticator::new(&config, Arc::clone(&users), Arc::clone(&tokens), audit.clone())?;
        let service = UserService::new(&config, users, tokens, audit.clone())?;
        let challenge = config
            .auth_keywords
            .first()
            .cloned()
            .unwrap_or_else(|| "Token".to_string());

        Ok(Self {
            router: Router::new(&config),
            auth,
            users: service,
            audit,
            challenge,
        })
    }

    /// The user service, for work outside a request such as seeding.
    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Serves one request.
    pub fn handle(&self, request: &RequestAdapter) -> ApiResponse {
        let request_id = request.request_id();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
        );
        let _entered = span.enter();

        let response = self.dispatch(&request_id, request);
        tracing::info!(status = response.status.as_u16(), "request served");
        if request.method() == Method::HEAD {
            response.without_body()
        } else {
            response
        }
    }

    fn dispatch(&self, request_id: &str, request: &RequestAdapter) -> ApiResponse {
        let Some(route) = self.router.resolve(request.path()) else {
            return ApiResponse::not_found();
        };
        let method = request.method();
        if !route.allows(method) {
            return ApiResponse::method_not_allowed(method, route.allowed_methods());
        }
        if method == Method::OPTIONS {
            return ApiResponse::options(route.allowed_methods());
        }

        if route == Route::Login {
            return self.login(request_id, request);
        }

        let meta = match self.auth.resolve(request_id, request.authorization()) {
            Ok(Some(principal)) => RequestMeta::authenticated(request_id, principal),
            Ok(None) => RequestMeta::anonymous(request_id),
            Err(e) => return self.error(e),
        };

        match route {
            Route::UserList if method == Method::POST => self.create(&meta, request),
            Route::UserList => self.respond(self.users.list(&meta), StatusCode::OK),
            Route::UserDetail(id) => self.detail(&meta, id, request),
            Route::Login => ApiResponse::not_found(),
        }
    }

    fn detail(&self, meta: &RequestMeta, id: UserId, request: &RequestAdapter) -> ApiResponse {
        let method = request.method();
        if method == Method::PATCH {
            let input = match request.json_body::<UserInput>() {
                Ok(input) => input,
                Err(e) => return ApiResponse::json(StatusCode::BAD_REQUEST, e.to_json()),
            };
            self.respond(self.users.partial_update(meta, id, input), StatusCode::OK)
        } else if method == Method::DELETE {
            match self.users.delete(meta, id) {
                Ok(()) => ApiResponse::no_content(),
                Err(e) => self.error(e),
            }
        } else {
            self.respond(self.users.retrieve(meta, id), StatusCode::OK)
        }
    }

    fn create(&self, meta: &RequestMeta, request: &RequestAdapter) -> ApiResponse {
        let input = match request.json_body::<UserInput>() {
            Ok(input) => input,
            Err(e) => return ApiResponse::json(StatusCode::BAD_REQUEST, e.to_json()),
        };
        self.respond(self.users.create(meta, input), StatusCode::CREATED)
    }

    fn login(&self, request_id: &str, request: &RequestAdapter) -> ApiResponse {
        let input = match request.json_body::<LoginInput>() {
            Ok(input) => input,
            Err(e) => return ApiResponse::json(StatusCode::BAD_REQUEST, e.to_json()),
        };
        match self.auth.login(request_id, input) {
            Ok(token) => ApiResponse::ok(&TokenBody {
                token: token.key.expose_secret(),
            }),
            Err(e) => self.error(e),
        }
    }

    fn respond<T: Serialize>(&self, result: Result<T>, status: StatusCode) -> ApiResponse {
        match result {
            Ok(value) if status == StatusCode::CREATED => ApiResponse::created(&value),
            Ok(value) => ApiResponse::ok(&value),
            Err(e) => self.error(e),
        }
    }

    fn error(&self, error: crate::Error) -> ApiResponse {
        ApiResponse::from_error(&error, &self.challenge)
    }
}
