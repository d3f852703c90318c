pub mod batching;
pub mod error;
pub mod runtime;
pub mod runtime_config;
