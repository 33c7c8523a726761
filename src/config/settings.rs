//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_APP_ENV, DEFAULT_APP_LOCALE, DEFAULT_APP_URL, DEFAULT_DATABASE_URL,
    DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_REDIS_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_STORAGE_ROOT, MIN_JWT_SECRET_LENGTH,
};

/// Client credentials of one OAuth provider
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub app_env: String,
    pub app_locale: String,
    pub app_url: String,
    pub database_url: String,
    pub redis_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub storage_root: String,
    pub google_oauth: Option<OAuthCredentials>,
    pub github_oauth: Option<OAuthCredentials>,
    /// Role given to accounts created by a social login
    pub oauth_default_role: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("app_locale", &self.app_locale)
            .field("app_url", &self.app_url)
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("storage_root", &self.storage_root)
            .field("google_oauth", &self.google_oauth.is_some())
            .field("github_oauth", &self.github_oauth.is_some())
            .field("oauth_default_role", &self.oauth_default_role)
            .finish()
    }
}

fn oauth_from_env(prefix: &str) -> Option<OAuthCredentials> {
    let client_id = env::var(format!("{}_CLIENT_ID", prefix)).ok()?;
    let client_secret = env::var(format!("{}_CLIENT_SECRET", prefix)).ok()?;
    if client_id.is_empty() || client_secret.is_empty() {
        return None;
    }
    Some(OAuthCredentials {
        client_id,
        client_secret,
    })
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set in release builds or is too short.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_APP_ENV.to_string()),
            app_locale: env::var("APP_LOCALE").unwrap_or_else(|_| DEFAULT_APP_LOCALE.to_string()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| DEFAULT_APP_URL.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRATION_HOURS),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            storage_root: env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| DEFAULT_STORAGE_ROOT.to_string()),
            google_oauth: oauth_from_env("OAUTH_GOOGLE"),
            github_oauth: oauth_from_env("OAUTH_GITHUB"),
            oauth_default_role: env::var("OAUTH_DEFAULT_ROLE")
                .unwrap_or_else(|_| domain::ROLE_USER.to_string()),
        }
    }

    /// Configuration for tests: fixed secret, no OAuth providers.
    pub fn for_tests() -> Self {
        Self {
            app_env: "testing".to_string(),
            app_locale: DEFAULT_APP_LOCALE.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            google_oauth: None,
            github_oauth: None,
            oauth_default_role: domain::ROLE_USER.to_string(),
        }
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Secure cookies everywhere but local development.
    pub fn secure_cookies(&self) -> bool {
        self.app_url.starts_with("https://")
    }
}
