use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use rand::Rng;

use crate::registry::SessionMode;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: Vec<u8>,
    pub bind_address: String,
    pub port: u16,
    pub frontend_url: String,
    pub session_mode: SessionMode,
    pub ping_interval: Duration,
    pub json_logs: bool,
    /// Set when no `JWT_SECRET` was configured and a random one was drawn.
    pub ephemeral_secret: bool,
}

impl Config {
    /// Read settings from the environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let (jwt_secret, ephemeral_secret) = match dotenv::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => (secret.into_bytes(), false),
            _ => {
                let key: [u8; 32] = rand::rng().random();
                (key.to_vec(), true)
            }
        };

        let session_mode = var_or("SESSION_MODE", "single");
        let session_mode = SessionMode::from_str(&session_mode)
            .map_err(|_| anyhow::anyhow!("SESSION_MODE must be `single` or `multi`, got `{session_mode}`"))?;

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://souklou.db"),
            jwt_secret,
            bind_address: var_or("BIND_ADDRESS", "0.0.0.0"),
            port: var_or("PORT", "5000").parse().context("PORT must be a port number")?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            session_mode,
            ping_interval: Duration::from_secs(
                var_or("WS_PING_SECS", "30")
                    .parse()
                    .context("WS_PING_SECS must be a number of seconds")?,
            ),
            json_logs: var_or("LOG_JSON", "false").parse().context("LOG_JSON must be true or false")?,
            ephemeral_secret,
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.bind_address, self.port))
    }
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}
