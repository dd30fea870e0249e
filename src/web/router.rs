use http::Method;

use crate::config::Config;
use crate::model::UserId;

/// A resolved endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Credential issuance
    Login,
    /// `{prefix}/users/`
    UserList,
    /// `{prefix}/users/{id}/`
    UserDetail(UserId),
}

const LOGIN_METHODS: &[Method] = &[Method::POST, Method::OPTIONS];
const LIST_METHODS: &[Method] = &[Method::GET, Method::POST, Method::HEAD, Method::OPTIONS];
const DETAIL_METHODS: &[Method] = &[
    Method::GET,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

impl Route {
    /// Methods the endpoint accepts, in `Allow` header order.
    pub fn allowed_methods(&self) -> &'static [Method] {
        match self {
            Route::Login => LOGIN_METHODS,
            Route::UserList => LIST_METHODS,
            Route::UserDetail(_) => DETAIL_METHODS,
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed_methods().contains(method)
    }
}

/// Matches request paths against the configured routes. A trailing slash is
/// optional everywhere.
#[derive(Debug, Clone)]
pub struct Router {
    login: String,
    users: String,
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

impl Router {
    pub fn new(config: &Config) -> Self {
        Self {
            login: normalize(&config.login_path).to_string(),
            users: config.users_root(),
        }
    }

    /// Resolves `path`, or `None` when nothing matches.
    pub fn resolve(&self, path: &str) -> Option<Route> {
        let path = normalize(path);
        if path == self.login {
            return Some(Route::Login);
        }
        let rest = path.strip_prefix(self.users.as_str())?;
        if rest.is_empty() {
            return Some(Route::UserList);
        }
        let id = rest.strip_prefix('/')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok().map(Route::UserDetail)
    }
}
