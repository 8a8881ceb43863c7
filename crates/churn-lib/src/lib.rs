//! Churn library for container lifecycle chaos testing
//!
//! This crate provides the core functionality for:
//! - Parsing and resolving the up:down churn ratio
//! - Selecting candidate containers by image
//! - Cloning a template container and tearing containers down
//! - Scheduling churn steps on a fixed interval
//! - Health checks and observability

pub mod churn;
pub mod driver;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod ratio;
pub mod sampler;

pub use churn::{ChurnLoop, ChurnLoopBuilder, ChurnStep, Phase, StepOutcome};
pub use driver::{ContainerDriver, DockerDriver};
pub use error::{ChurnError, DriverOp};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ChurnLogger, ChurnMetrics};
pub use ratio::Ratio;
pub use sampler::{RngSampler, Sampler, SamplingMode};
