//! Conf module: configuration model and loading from file / environment.

pub mod model;
pub mod load;

pub use load::ConfigError;
pub use model::{FlushConfig, LogTypeConfig, LogpipeConfig};
