//! Process Configuration
//! Mission: Resolve all tunables once at startup into an immutable value

use anyhow::{Context, Result};
use chrono::Duration;
use rand::RngCore;
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// File the generated bootstrap admin password is written to, inside the
/// data directory.
pub const PASSWORD_FILE: &str = "initial-admin-password";

const SQLITE_DATABASE: &str = "sqlite-database.db";
const DEFAULT_NGINX_CONF: &str = "/usr/local/nginx/conf/nginx.conf";

/// Everything the process needs to know, established before the listener
/// binds and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub realm: String,
    pub token_timeout: Duration,
    pub max_refresh: Duration,
    pub bcrypt_cost: u32,
    pub admin_password: Option<String>,
    pub nginx_conf_path: PathBuf,
}

impl Settings {
    /// Read settings from the environment, generating a signing secret if
    /// none was supplied.
    pub fn from_env() -> Result<Self> {
        let data_dir = resolve_data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let db_path = data_dir.join(SQLITE_DATABASE);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                warn!("JWT_SECRET not set, generating one; issued tokens will not survive a restart");
                generate_secret()
            }
        };

        let realm = env::var("AUTH_REALM").unwrap_or_else(|_| "streaming server".to_string());

        let token_timeout_mins = env::var("TOKEN_TIMEOUT_MINS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(60);
        let max_refresh_mins = env::var("TOKEN_MAX_REFRESH_MINS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(60);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&v| (4..=31).contains(&v))
            .unwrap_or(14);

        let admin_password = env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let nginx_conf_path = env::var("NGINX_CONF_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NGINX_CONF));

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Self {
            bind_addr,
            data_dir,
            db_path,
            jwt_secret,
            realm,
            token_timeout: Duration::minutes(token_timeout_mins),
            max_refresh: Duration::minutes(max_refresh_mins),
            bcrypt_cost,
            admin_password,
            nginx_conf_path,
        })
    }
}

/// Home folder for the database and generated credentials. Overridable with
/// STREAMING_SERVER_PATH, otherwise a per-OS default.
fn resolve_data_dir() -> PathBuf {
    if let Ok(p) = env::var("STREAMING_SERVER_PATH") {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }

    if cfg!(windows) {
        PathBuf::from(r"C:\ProgramData\StreamingServer")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Applications/StreamingServer")
    } else {
        PathBuf::from("/etc/streaming-server")
    }
}

/// Generate a 256-bit signing secret, hex encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a random password of `size` bytes, hex encoded.
pub fn generate_password(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_password_length() {
        // Hex encoding doubles the byte count.
        let pwd = generate_password(12);
        assert_eq!(pwd.len(), 12 * 2);
    }

    #[test]
    fn test_generate_secret_is_unique() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
