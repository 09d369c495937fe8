use std::sync::Arc;

use tracing::debug;

use super::catalog;
use super::chain::Pipeline;
use super::definition::LogTypeDefinition;
use super::traits::{FilesReceiver, LoggingReceiver, ReceiverProcessor};
use crate::conf::LogTypeConfig;
use crate::error::BuildError;
use crate::parser::PipelineMetrics;

/// A registry key bound to the factory for its definition.
#[derive(Debug, Clone, Copy)]
pub struct LogTypeEntry {
    pub name: &'static str,
    pub default_include_paths: &'static [&'static str],
    pub definition: fn() -> LogTypeDefinition,
}

/// Ordered table of known log types, filled by explicit `register` calls.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<LogTypeEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in application type.
    pub fn builtin() -> Result<Self, BuildError> {
        let mut registry = Self::new();
        catalog::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, entry: LogTypeEntry) -> Result<(), BuildError> {
        if self.get(entry.name).is_some() {
            return Err(BuildError::DuplicateLogType(entry.name.to_string()));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LogTypeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the receiver + pipeline pair for one configured log type.
    pub fn resolve(
        &self,
        config: &LogTypeConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<LoggingReceiver, BuildError> {
        let entry = self
            .get(&config.log_type)
            .ok_or_else(|| BuildError::UnknownLogType(config.log_type.clone()))?;

        let pipeline = Pipeline::build(
            &config.name,
            (entry.definition)(),
            &config.overrides,
            &config.field_ops,
            metrics,
        )?;

        let include_paths = if config.include_paths.is_empty() {
            entry
                .default_include_paths
                .iter()
                .map(|p| p.to_string())
                .collect()
        } else {
            config.include_paths.clone()
        };

        debug!(
            name = %config.name,
            log_type = entry.name,
            paths = include_paths.len(),
            "log type resolved"
        );

        let receiver = FilesReceiver::new(&config.name, include_paths, config.exclude_paths.clone());
        Ok(ReceiverProcessor::new(receiver, pipeline))
    }
}
