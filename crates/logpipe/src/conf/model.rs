//! Model: LogpipeConfig and related structs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::definition::PipelineOverrides;
use crate::remap::FieldOp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogpipeConfig {
    pub flush: FlushConfig,
    pub log_types: Vec<LogTypeConfig>,
}

/// Timeout-driven flushing of pending multi-line records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Idle time after which a pending record is flushed.
    pub timeout_ms: u64,
    /// Period of the background flush job.
    pub interval_ms: u64,
}

/// One configured log type: a stream tag bound to a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTypeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub log_type: String,
    /// Empty means the application's default paths.
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default)]
    pub overrides: PipelineOverrides,
    /// Appended after the application's own field ops.
    #[serde(default)]
    pub field_ops: Vec<FieldOp>,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            interval_ms: 250,
        }
    }
}

impl FlushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl LogTypeConfig {
    pub fn new(name: &str, log_type: &str) -> Self {
        Self {
            name: name.to_string(),
            log_type: log_type.to_string(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
            overrides: PipelineOverrides::default(),
            field_ops: Vec::new(),
        }
    }
}
