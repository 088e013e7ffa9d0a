//! Environment-variable configuration. Grounded on
//! `rustpress-server/src/main.rs::load_config`'s env-override pattern,
//! narrowed to a flat env-only config (the original source's
//! `pydantic_settings.BaseSettings` reads purely from env too, per
//! `examples/original_source/src/config.py`).

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub pg_dsn: String,
    pub rabbit_url: String,
    pub lock_batch: i64,
    pub tick_interval: Duration,
    pub ingest_prefetch: u16,
    pub db_pool_min: u32,
    pub db_pool_max: u32,
    pub shutdown_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            pg_dsn: require_env("PG_DSN")?,
            rabbit_url: require_env("RABBIT_URL")?,
            lock_batch: env_or("LOCK_BATCH", 500),
            tick_interval: Duration::from_millis(env_or("TICK_MS", 500)),
            ingest_prefetch: env_or("INGEST_PREFETCH", 256),
            db_pool_min: env_or("DB_POOL_MIN", 2),
            db_pool_max: env_or("DB_POOL_MAX", 10),
            shutdown_timeout: Duration::from_secs(env_or("SHUTDOWN_TIMEOUT_SECS", 30)),
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default_on_missing_or_bad_value() {
        assert_eq!(env_or::<i64>("SCHEDULER_CLI_TEST_UNSET_KEY", 500), 500);
    }
}
