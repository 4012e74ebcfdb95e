//! Server configuration, read from `PORTAL_*` environment variables.

use anyhow::{Context, Result};
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Origin allowed by CORS, e.g. the dev server of a web client
    pub allowed_origin: String,
    /// Create a demo parent, teacher, children and requests on start up
    pub seed_demo: bool,
    pub password_hash_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allowed_origin: "http://localhost:8080".to_string(),
            seed_demo: false,
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("PORTAL_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("PORTAL_BIND_ADDR is not a socket address: {addr}"))?;
        }
        if let Ok(origin) = std::env::var("PORTAL_ALLOWED_ORIGIN") {
            config.allowed_origin = origin;
        }
        if let Ok(seed) = std::env::var("PORTAL_SEED_DEMO") {
            config.seed_demo = matches!(seed.trim(), "1" | "true" | "yes");
        }
        if let Ok(cost) = std::env::var("PORTAL_HASH_COST") {
            config.password_hash_cost = cost
                .parse()
                .with_context(|| format!("PORTAL_HASH_COST is not a number: {cost}"))?;
        }

        Ok(config)
    }

    /// Cheap password hashing and no demo data
    pub fn for_tests() -> Self {
        Self {
            password_hash_cost: 4,
            ..Self::default()
        }
    }
}
