//! Application module
//!
//! Configuration handling and logging setup for embedding applications.

pub mod config;
pub mod logging;

pub use config::{AppConfig, BatchConfig, PipelineConfig, RegistryConfig};
pub use logging::init_logging;
