use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: Transport,
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub call_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_TRANSPORT must be one of: http, stdio")]
    InvalidTransport,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_CALL_TIMEOUT_SECS must be a positive integer")]
    InvalidCallTimeout,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let transport = match env::var("MCP_TRANSPORT")
            .ok()
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .as_deref()
        {
            None | Some("http") => Transport::Http,
            Some("stdio") => Transport::Stdio,
            _ => return Err(ConfigError::InvalidTransport),
        };

        let api_token = env::var("MCP_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let call_timeout_secs = env::var("MCP_CALL_TIMEOUT_SECS")
            .ok()
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidCallTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS);
        if call_timeout_secs == 0 {
            return Err(ConfigError::InvalidCallTimeout);
        }

        let config = Self {
            transport,
            api_token,
            bind_addr,
            bind_port,
            call_timeout: Duration::from_secs(call_timeout_secs),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
