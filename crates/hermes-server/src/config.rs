use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::Duration;

use hermes_db::DbConfig;

/// Process configuration, read once at startup and handed to the parts that
/// need it.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

pub struct JwtConfig {
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub ttl: Duration,
}

pub struct PasswordConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub pepper: Vec<u8>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Secrets accept a `<KEY>_FILE` variant naming
    /// a file to read instead.
    pub fn from_source<F>(source: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_hours: i64 = parsed(&source, "JWT_TTL_HOURS", 24)?;
        if ttl_hours <= 0 {
            return Err(anyhow!("JWT_TTL_HOURS must be positive"));
        }
        let ttl = Duration::try_hours(ttl_hours)
            .ok_or_else(|| anyhow!("JWT_TTL_HOURS is out of range: {}", ttl_hours))?;

        let max_open_conns: usize = parsed(&source, "DB_MAX_OPEN_CONNS", 5)?;
        if max_open_conns == 0 {
            return Err(anyhow!("DB_MAX_OPEN_CONNS must be at least 1"));
        }

        Ok(Config {
            host: source("HERMES_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&source, "HERMES_PORT", 8080)?,
            db: DbConfig {
                path: PathBuf::from(source("DB_PATH").unwrap_or_else(|| "hermes.db".to_string())),
                max_open_conns,
            },
            jwt: JwtConfig {
                private_key_pem: secret(&source, "JWT_PRIVATE_KEY")?,
                public_key_pem: secret(&source, "JWT_PUBLIC_KEY")?,
                ttl,
            },
            password: PasswordConfig {
                time_cost: parsed(&source, "PASSWORD_HASH_COST", 2)?,
                memory_kib: parsed(&source, "PASSWORD_HASH_MEMORY_KIB", 19 * 1024)?,
                pepper: secret(&source, "PEPPER_KEY")?.into_bytes(),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<F, T>(source: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match source(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", key, e)),
        None => Ok(default),
    }
}

fn secret<F>(source: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let file_key = format!("{}_FILE", key);
    let value = match source(&file_key).filter(|path| !path.is_empty()) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} from {}", key, path))?
            .trim_end_matches(['\r', '\n'])
            .to_string(),
        None => source(key).unwrap_or_default(),
    };

    if value.is_empty() {
        return Err(anyhow!("{} (or {}) must be set", key, file_key));
    }
    Ok(value)
}
