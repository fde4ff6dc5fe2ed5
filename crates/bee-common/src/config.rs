//! Layered configuration for the orchestration core.
//!
//! Every config type implements `Default`; `BeeConfig::load` layers a parsed
//! TOML file over those defaults and then `BEE_*` environment variables,
//! mirroring the precedence assistantd uses for its listen port.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BeeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeeConfig {
    pub workdir: PathBuf,
    pub archive_root: PathBuf,
    pub tm: TaskManagerConfig,
    pub wfm: WorkflowManagerConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskManagerConfig {
    pub tick_interval_secs: u64,
    pub max_poll_failures: u32,
    pub backend: BackendKind,
    pub listen_addr: String,
    /// Where the TM PUTs task state updates back to the WFM.
    pub wfm_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Slurm,
    Lsf,
    Simple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowManagerConfig {
    pub listen_addr: String,
    pub tm_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub default_algorithm: String,
    pub mars_threshold: usize,
}

impl Default for BeeConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("/tmp/bee-workdir"),
            archive_root: PathBuf::from("/tmp/bee-workdir/archives"),
            tm: TaskManagerConfig::default(),
            wfm: WorkflowManagerConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            max_poll_failures: 3,
            backend: BackendKind::Simple,
            listen_addr: "127.0.0.1:5050".to_string(),
            wfm_addr: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl Default for WorkflowManagerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            tm_addr: "http://127.0.0.1:5050".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_algorithm: "backfill".to_string(),
            mars_threshold: 32,
        }
    }
}

impl BeeConfig {
    /// Loads config from an optional TOML file, then overlays `BEE_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, BeeError> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| BeeError::BadRequest(format!("reading {}: {e}", p.display())))?;
                toml::from_str(&text)
                    .map_err(|e| BeeError::BadRequest(format!("parsing {}: {e}", p.display())))?
            }
            None => BeeConfig::default(),
        };
        cfg.overlay_env();
        Ok(cfg)
    }

    fn overlay_env(&mut self) {
        if let Ok(v) = std::env::var("BEE_WORKDIR") {
            self.workdir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BEE_ARCHIVE_ROOT") {
            self.archive_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BEE_TM_LISTEN_ADDR") {
            self.tm.listen_addr = v;
        }
        if let Ok(v) = std::env::var("BEE_TM_WFM_ADDR") {
            self.tm.wfm_addr = v;
        }
        if let Ok(v) = std::env::var("BEE_WFM_LISTEN_ADDR") {
            self.wfm.listen_addr = v;
        }
        if let Ok(v) = std::env::var("BEE_WFM_TM_ADDR") {
            self.wfm.tm_addr = v;
        }
        if let Ok(v) = std::env::var("BEE_TICK_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.tm.tick_interval_secs = n;
            }
        }
    }
}
