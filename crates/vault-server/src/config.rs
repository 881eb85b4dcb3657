use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vault_core::{ConnectionConfig, ContentModerator, NoopModerator, StubWordListModerator};

#[derive(Parser, Debug, Clone)]
#[command(name = "vault-server")]
#[command(about = "Personal knowledge graph service")]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "VAULT_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: SocketAddr,

    /// Data directory for the embedded store
    #[arg(long, env = "VAULT_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Keyword-overlap threshold for the connection engine
    #[arg(long, env = "VAULT_LINK_THRESHOLD", default_value = "0.2")]
    pub link_threshold: f64,

    /// Maximum candidate connections created per new node
    #[arg(long, env = "VAULT_MAX_CONNECTIONS", default_value = "20")]
    pub max_connections: usize,

    /// Whether updating a node re-runs candidate discovery
    #[arg(long, env = "VAULT_RELINK_ON_UPDATE", default_value = "false")]
    pub relink_on_update: bool,

    /// Idempotency record time-to-live, in seconds
    #[arg(long, env = "VAULT_IDEMPOTENCY_TTL_SECS", default_value = "86400")]
    pub idempotency_ttl_secs: u64,

    /// Comma-separated blocklist terms for the content moderator, empty to
    /// disable moderation
    #[arg(long, env = "VAULT_MODERATION_BLOCKLIST", value_delimiter = ',', default_value = "")]
    pub moderation_blocklist: Vec<String>,
}

impl Config {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            threshold: self.link_threshold,
            max_connections: self.max_connections,
            rediscover_on_update: self.relink_on_update,
        }
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("vault.redb")
    }

    pub fn content_moderator(&self) -> Arc<dyn ContentModerator> {
        let blocked: Vec<String> = self.moderation_blocklist.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        if blocked.is_empty() {
            Arc::new(NoopModerator)
        } else {
            Arc::new(StubWordListModerator::new(blocked))
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".parse().unwrap(),
            data_dir: PathBuf::from("./data"),
            link_threshold: 0.2,
            max_connections: 20,
            relink_on_update: false,
            idempotency_ttl_secs: 86_400,
            moderation_blocklist: Vec::new(),
        }
    }
}
