//! Testing utilities and fixtures
//!
//! Mock handlers with fixed behavior plus a prebuilt registry, shared by unit
//! tests, integration tests and benchmarks.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{echo_batch, sample_registry, sample_registry_with_config, user_orders_pipeline};
pub use mocks::{
    DelayedHandler, EchoHandler, ErroringHandler, FailingHandler, PanickingHandler, RecordedCall,
    RecordingHandler, StaticHandler,
};
