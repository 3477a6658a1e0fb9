//! Layered YAML configuration, grounded in
//! `fechatter_server::config::AppConfig` / `notify_server::config::AppConfig::load`.

use std::fs::File;

use chat_core::AuthConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub nats: NatsConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub db_url: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub frames_per_second: u32,
    pub burst: u32,
    pub max_frame_bytes: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            frames_per_second: 20,
            burst: 40,
            max_frame_bytes: 64 * 1024,
        }
    }
}

impl AppConfig {
    /// Tries `chat.yml` in the working directory, then
    /// `/etc/config/chat.yml`, then the file named by `CHAT_CONFIG`.
    pub fn load() -> anyhow::Result<Self> {
        let reader: Box<dyn std::io::Read> = if let Ok(file) = File::open("chat.yml") {
            Box::new(file)
        } else if let Ok(file) = File::open("/etc/config/chat.yml") {
            Box::new(file)
        } else if let Ok(path) = std::env::var("CHAT_CONFIG") {
            Box::new(File::open(path)?)
        } else {
            anyhow::bail!("no configuration file found: tried chat.yml, /etc/config/chat.yml, CHAT_CONFIG");
        };

        Ok(serde_yaml::from_reader(reader)?)
    }
}
