//! Secrets file and environment lookup for database credentials.

use crate::error::AppError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Secrets namespace holding the database bundle.
pub const DB_NAMESPACE: &str = "postgres";
pub const ENV_SECRETS_PATH: &str = "ALTOS_SECRETS_PATH";
pub const ENV_DB_PATH: &str = "ALTOS_DB_PATH";
pub const ENV_DB_USER: &str = "ALTOS_DB_USER";
/// Compared against the secret of the same name for the `check-env` diagnostic.
pub const ENV_DB_USERNAME: &str = "ALTOS_DB_USERNAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub path: PathBuf,
    pub user: String,
}

/// Default secrets location: `<config dir>/altos-dashboard/secrets.json`.
pub fn default_secrets_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("altos-dashboard").join("secrets.json")
}

/// Resolve the secrets path: explicit flag, then env var, then the default.
pub fn resolve_secrets_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    match std::env::var(ENV_SECRETS_PATH) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => default_secrets_path(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecretsStore {
    root: serde_json::Map<String, Value>,
}

impl SecretsStore {
    /// Load a JSON object from disk. A missing file yields an empty store so
    /// environment variables alone can still supply everything.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::warn!("Secrets file {:?} not found; relying on environment", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::Validation(format!("Invalid secrets JSON: {}", e)))?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(AppError::Validation("Secrets must be a JSON object".into())),
        }
    }

    /// Top-level string secret.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.root.get(key).and_then(Value::as_str)
    }

    /// String secret inside a namespace object, e.g. `postgres.user`.
    pub fn get_in(&self, namespace: &str, key: &str) -> Option<&str> {
        self.root
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .and_then(Value::as_str)
    }

    /// Database bundle: env overrides first, then the `postgres` namespace.
    pub fn db_credentials(&self) -> Result<DbCredentials, AppError> {
        let path = lookup(ENV_DB_PATH, self.get_in(DB_NAMESPACE, "path"))
            .ok_or_else(|| AppError::MissingCredential(format!("{}.path", DB_NAMESPACE)))?;
        let user = lookup(ENV_DB_USER, self.get_in(DB_NAMESPACE, "user"))
            .ok_or_else(|| AppError::MissingCredential(format!("{}.user", DB_NAMESPACE)))?;
        Ok(DbCredentials {
            path: PathBuf::from(path),
            user,
        })
    }

    /// Whether env var `key` equals the top-level secret `key`.
    /// Informational only; never used to grant or deny access.
    pub fn env_matches_secret(&self, key: &str) -> Result<bool, AppError> {
        let env = std::env::var(key).map_err(|_| AppError::MissingCredential(format!("env {}", key)))?;
        let secret = self
            .get(key)
            .ok_or_else(|| AppError::MissingCredential(format!("secret {}", key)))?;
        Ok(env == secret)
    }
}

fn lookup(env_key: &str, fallback: Option<&str>) -> Option<String> {
    match std::env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => fallback.map(str::to_string),
    }
}
