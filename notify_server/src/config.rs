//! Layered YAML configuration, grounded in
//! `notify_server::config::AppConfig::load`.

use std::fs::File;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub nats: NatsConfig,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Same Postgres instance `chat_server` migrates; this binary only
    /// reads `participants` from it and owns its own `notifications` table.
    pub db_url: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Capacity of the in-memory `event_id` LRU.
    pub lru_capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { lru_capacity: 100_000 }
    }
}

impl AppConfig {
    /// Tries `notify.yml` in the working directory, then
    /// `/etc/config/notify.yml`, then the file named by `NOTIFY_CONFIG`.
    pub fn load() -> anyhow::Result<Self> {
        let reader: Box<dyn std::io::Read> = if let Ok(file) = File::open("notify.yml") {
            Box::new(file)
        } else if let Ok(file) = File::open("/etc/config/notify.yml") {
            Box::new(file)
        } else if let Ok(path) = std::env::var("NOTIFY_CONFIG") {
            Box::new(File::open(path)?)
        } else {
            anyhow::bail!("no configuration file found: tried notify.yml, /etc/config/notify.yml, NOTIFY_CONFIG");
        };

        Ok(serde_yaml::from_reader(reader)?)
    }
}
