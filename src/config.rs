use serde::{Deserialize, Serialize};
use std::fs;

use crate::transfers::types::Participant;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    pub admin_api: AdminApiConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// Settlement model assigned by the local settlement policy
    #[serde(default = "default_settlement_model")]
    pub settlement_model: String,
    /// Participant set served by the local directory adapter
    #[serde(default)]
    pub participants: Vec<Participant>,
}

fn default_settlement_model() -> String {
    "DEFAULT".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerSettings {
    pub queue_size: usize,
    pub batch_size: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolverSettings {
    pub participant_cache_ttl_secs: u64,
    pub participant_cache_capacity: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            participant_cache_ttl_secs: 30,
            participant_cache_capacity: 512,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
