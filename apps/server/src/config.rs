use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    /// Unset or blank means demo data
    pub finnhub_api_key: Option<String>,
    /// Bearer secret guarding the alert check endpoint
    pub cron_secret: Option<String>,
    pub alert_check_interval: Duration,
    pub quote_timeout: Duration,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_string(name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_string("PW_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid PW_LISTEN_ADDR")?;
        let db_path = env_string("PW_DB_PATH").unwrap_or_else(|| "./db/app.db".into());
        let cors_allow = env_string("PW_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            listen_addr,
            db_path,
            finnhub_api_key: env_string("FINNHUB_API_KEY"),
            cron_secret: env_string("CRON_SECRET"),
            alert_check_interval: Duration::from_secs(
                env_u64("PW_ALERT_CHECK_INTERVAL_SECS", 60).max(1),
            ),
            quote_timeout: Duration::from_millis(env_u64("PW_QUOTE_TIMEOUT_MS", 12_000)),
            cors_allow,
            request_timeout: Duration::from_millis(env_u64("PW_REQUEST_TIMEOUT_MS", 30_000)),
        })
    }
}
