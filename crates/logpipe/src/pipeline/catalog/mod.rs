//! Built-in application log types.
//!
//! Each module owns the definitions for one application and registers them
//! through an explicit `register` call; `register_all` is the only place
//! the full list is spelled out.

mod common;

pub mod apache;
pub mod cassandra;
pub mod generic;
pub mod kafka;
pub mod nginx;
pub mod postgresql;
pub mod redis;
pub mod zookeeper;

pub use common::INSTRUMENTATION_FIELD;

use super::registry::Registry;
use crate::error::BuildError;

pub fn register_all(registry: &mut Registry) -> Result<(), BuildError> {
    apache::register(registry)?;
    nginx::register(registry)?;
    kafka::register(registry)?;
    zookeeper::register(registry)?;
    postgresql::register(registry)?;
    redis::register(registry)?;
    cassandra::register(registry)?;
    generic::register(registry)?;
    Ok(())
}
