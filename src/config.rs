use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::storage::{DurabilityMode, persistence::DEFAULT_CHECKPOINT_THRESHOLD};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub durability: DurabilityMode,
    pub checkpoint_every: usize,
    pub public_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr = env_string("TODOLIST_BIND_ADDR", "127.0.0.1:3000")
            .parse::<SocketAddr>()
            .context("TODOLIST_BIND_ADDR must be a valid host:port")?;

        let data_dir = PathBuf::from(env_string("TODOLIST_DATA_DIR", ".data"));

        let durability = env_string("TODOLIST_DURABILITY", "async")
            .parse::<DurabilityMode>()
            .map_err(|err| anyhow!(err))
            .context("TODOLIST_DURABILITY is invalid")?;

        let checkpoint_every = env_string(
            "TODOLIST_CHECKPOINT_EVERY",
            &DEFAULT_CHECKPOINT_THRESHOLD.to_string(),
        )
        .parse::<usize>()
        .context("TODOLIST_CHECKPOINT_EVERY must be a positive integer")?;
        if checkpoint_every == 0 {
            return Err(anyhow!("TODOLIST_CHECKPOINT_EVERY must be greater than zero"));
        }

        let public_dir = PathBuf::from(env_string("TODOLIST_PUBLIC_DIR", "public"));

        Ok(Self {
            bind_addr,
            data_dir,
            durability,
            checkpoint_every,
            public_dir,
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
