//! Ratio-driven container churn
//!
//! A churn step selects the containers of one image, clones one of them
//! `up` times and tears down `down` of the original candidates. The churn
//! loop fires a step every tick until shutdown.

mod destroyer;
mod r#loop;
mod replicator;
mod selector;
mod step;


pub use destroyer::{destroy, DestroyOptions};
pub use r#loop::{ChurnConfig, ChurnLoop, ChurnLoopBuilder};
pub use replicator::replicate;
pub use selector::select;
pub use step::{ChurnStep, StepOutcome};

use std::fmt;

/// Phases of a churn step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the next tick
    Idle,
    Selecting,
    Replicating,
    Destroying,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Selecting => "selecting",
            Phase::Replicating => "replicating",
            Phase::Destroying => "destroying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
