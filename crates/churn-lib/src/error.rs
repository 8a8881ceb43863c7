//! Error types for churn operations

use crate::churn::Phase;
use std::fmt;
use thiserror::Error;

/// Driver call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOp {
    List,
    Inspect,
    Create,
    Start,
    Stop,
    Wait,
    Remove,
}

impl DriverOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverOp::List => "list",
            DriverOp::Inspect => "inspect",
            DriverOp::Create => "create",
            DriverOp::Start => "start",
            DriverOp::Stop => "stop",
            DriverOp::Wait => "wait",
            DriverOp::Remove => "remove",
        }
    }
}

impl fmt::Display for DriverOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a churn step or by ratio parsing
#[derive(Debug, Error)]
pub enum ChurnError {
    /// The ratio string is not of the form `<u8>:<u8>`
    #[error("invalid ratio {input:?}: {reason}")]
    Format { input: String, reason: String },

    /// A container runtime call failed
    #[error("could not {op} container{}: {source}", fmt_container(.container_id))]
    Driver {
        op: DriverOp,
        container_id: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// More deletions were requested than there are candidates
    #[error("can not delete {requested} containers when only {available} exist")]
    InsufficientCandidates { requested: usize, available: usize },
}

fn fmt_container(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" {}", id),
        None => String::new(),
    }
}

impl ChurnError {
    pub(crate) fn driver(op: DriverOp, container_id: Option<&str>, source: anyhow::Error) -> Self {
        ChurnError::Driver {
            op,
            container_id: container_id.map(str::to_string),
            source,
        }
    }

    /// Phase of the churn step in which this error was raised
    pub fn phase(&self) -> Phase {
        match self {
            ChurnError::Format { .. } => Phase::Idle,
            ChurnError::Driver { op, .. } => match op {
                DriverOp::List => Phase::Selecting,
                DriverOp::Inspect | DriverOp::Create | DriverOp::Start => Phase::Replicating,
                DriverOp::Stop | DriverOp::Wait | DriverOp::Remove => Phase::Destroying,
            },
            ChurnError::InsufficientCandidates { .. } => Phase::Destroying,
        }
    }
}
