//! Service configuration, loaded from TOML.
//!
//! Every key is optional; missing keys take their defaults.
//!
//! ```toml
//! api_prefix = "/api/v1"
//! login_path = "/api-token-auth/"
//! auth_keywords = ["Token", "Bearer"]
//! audit_capacity = 10000
//!
//! [limits]
//! username_max_len = 150
//!
//! [hashing]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::password::HashingParams;
use crate::sanitizer::FieldLimits;

pub(crate) const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix of the user collection routes; `{api_prefix}/users/`.
    pub api_prefix: String,
    /// Route of the login endpoint.
    pub login_path: String,
    /// Accepted keywords of the `Authorization` header, matched without case.
    pub auth_keywords: Vec<String>,
    /// Audit events kept in memory; the oldest are dropped beyond this.
    pub audit_capacity: usize,
    pub limits: FieldLimits,
    pub hashing: HashingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_prefix: "/api/v1".to_string(),
            login_path: "/api-token-auth/".to_string(),
            auth_keywords: vec!["Token".to_string(), "Bearer".to_string()],
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            limits: FieldLimits::default(),
            hashing: HashingParams::default(),
        }
    }
}

impl Config {
    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// `Error::Config` on malformed TOML or values that fail validation.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Default settings with the cheapest password hashing. For tests and
    /// demos only.
    pub fn for_testing() -> Self {
        Self {
            hashing: HashingParams::insecure_fast(),
            ..Self::default()
        }
    }

    /// Checks values that deserialization alone cannot. Constructors of
    /// the service and the authenticator run this too, since fields are
    /// public.
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.api_prefix.starts_with('/') {
            return Err(Error::Config("api_prefix must start with '/'".into()));
        }
        if !self.login_path.starts_with('/') {
            return Err(Error::Config("login_path must start with '/'".into()));
        }
        if self.auth_keywords.is_empty() {
            return Err(Error::Config("auth_keywords must not be empty".into()));
        }
        if self.auth_keywords.iter().any(|k| k.is_empty() || k.contains(' ')) {
            return Err(Error::Config("auth_keywords must be single words".into()));
        }
        if self.audit_capacity == 0 {
            return Err(Error::Config("audit_capacity must be positive".into()));
        }
        let limits = &self.limits;
        if limits.username_max_len == 0 || limits.name_max_len == 0 || limits.password_max_len == 0 {
            return Err(Error::Config("field limits must be positive".into()));
        }
        Ok(())
    }

    /// `api_prefix` without a trailing slash.
    pub(crate) fn users_root(&self) -> String {
        format!("{}/users", self.api_prefix.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_routes() {
        let config = Config::default();
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.login_path, "/api-token-auth/");
        assert_eq!(config.auth_keywords, vec!["Token", "Bearer"]);
        assert_eq!(config.limits.username_max_len, 150);
        assert_eq!(config.audit_capacity, 10_000);
        assert_eq!(config.users_root(), "/api/v1/users");
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = Config::parse(
            r#"
api_prefix = "/api/v2/"

[limits]
password_max_len = 64

[hashing]
iterations = 3
"#,
        )
        .unwrap();

        assert_eq!(config.users_root(), "/api/v2/users");
        assert_eq!(config.limits.password_max_len, 64);
        assert_eq!(config.limits.username_max_len, 150);
        assert_eq!(config.hashing.iterations, 3);
        assert_eq!(config.hashing.memory_kib, HashingParams::default().memory_kib);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(Config::parse("api_prefix = "), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::parse("api_prefix = \"api\"").is_err());
        assert!(Config::parse("auth_keywords = []").is_err());
        assert!(Config::parse("auth_keywords = [\"To ken\"]").is_err());
        assert!(Config::parse("[limits]\nname_max_len = 0").is_err());
        assert!(Config::parse("audit_capacity = 0").is_err());
    }

    #[test]
    fn validate_catches_values_set_in_code() {
        let mut config = Config::for_testing();
        assert!(config.validate().is_ok());

        config.limits.password_max_len = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "login_path = \"/login/\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.login_path, "/login/");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
