//! # Dualstream Core
//!
//! Shared building blocks for the dualstream model monitor:
//! - Error type and `Result` alias
//! - Monitoring configuration (thresholds, retrain policy, method selection)
//! - Data model: baselines, column batches, persisted monitor state
//! - Alert envelopes and state event records

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod state;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::{Baseline, Batch, Column};
    pub use crate::config::{
        KsMethod, MonitorConfig, OutlierMethod, PageHinkleyConfig, RetrainKind, RetrainPolicy,
        Thresholds,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        AlertEnvelope, AlertKind, DriftFinding, EventBody, EventDetail, MonitorEvent,
    };
    pub use crate::state::MonitorState;
}
