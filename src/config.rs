use std::{env, net::SocketAddr};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://frota.db".to_string());
        let listen_addr: SocketAddr = env::var("FROTA_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| EngineError::Config(format!("invalid FROTA_LISTEN_ADDR: {err}")))?;

        Ok(Self {
            database_url,
            listen_addr,
        })
    }
}
