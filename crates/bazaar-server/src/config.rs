use std::path::PathBuf;

use bazaar_core::AppError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JWT_TTL_SECS: i64 = 86_400;
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// HTTP server settings read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub upload_dir: PathBuf,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("upload_dir", &self.upload_dir)
            .finish()
    }
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `BAZAAR_JWT_SECRET` (required)
    /// - `BAZAAR_JWT_TTL_SECS` (optional, defaults to one day)
    /// - `BAZAAR_SERVER_PORT` (optional, defaults to 3000)
    /// - `BAZAAR_UPLOAD_DIR` (optional, defaults to `uploads`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let jwt_secret = lookup("BAZAAR_JWT_SECRET").ok_or_else(|| {
            AppError::ConfigError("BAZAAR_JWT_SECRET not set. Required to sign tokens.".into())
        })?;

        Ok(Self {
            port: parse_or(&lookup, "BAZAAR_SERVER_PORT", DEFAULT_PORT)?,
            jwt_secret,
            jwt_ttl_secs: parse_or(&lookup, "BAZAAR_JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS)?,
            upload_dir: lookup("BAZAAR_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::ConfigError(format!("Invalid {key} '{raw}'"))),
    }
}
