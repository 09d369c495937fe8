// Domain-driven module structure for logpipe.

// Core engine
pub mod error;
pub mod parser;
pub mod service;
pub mod remap;
pub mod pipeline;

// Outer surface
pub mod conf;
pub mod runtime;
