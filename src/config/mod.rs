//! Server configuration read from the environment.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Multipart image uploads are capped at 10MB.
pub const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub s3_bucket: String,
    /// S3-compatible endpoint (e.g. MinIO). `None` uses the AWS default.
    pub s3_endpoint: Option<String>,
    pub imgproxy_url: String,
    pub imgproxy_key: String,
    pub imgproxy_salt: String,
    pub frontend_dir: Option<PathBuf>,
    pub upload_limit: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;
        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => parse_positive("DATABASE_MAX_CONNECTIONS", &v)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let upload_limit = match get("UPLOAD_LIMIT_BYTES") {
            Some(v) => parse_positive("UPLOAD_LIMIT_BYTES", &v)?,
            None => DEFAULT_UPLOAD_LIMIT,
        };

        Ok(ServerConfig {
            database_url: required("DATABASE_URL")?,
            bind_addr,
            max_connections,
            s3_bucket: required("S3_BUCKET")?,
            s3_endpoint: get("S3_ENDPOINT"),
            imgproxy_url: required("IMGPROXY_URL")?,
            imgproxy_key: required("IMGPROXY_KEY")?,
            imgproxy_salt: required("IMGPROXY_SALT")?,
            frontend_dir: get("FRONTEND_DIR").map(PathBuf::from),
            upload_limit,
        })
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed = value.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(parsed)
}
