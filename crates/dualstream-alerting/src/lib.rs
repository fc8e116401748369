//! # Dualstream Alerting
//!
//! Fire-and-forget publication of monitor alerts. Every alert is wrapped in an
//! [`AlertEnvelope`](dualstream_core::events::AlertEnvelope) and handed to an
//! [`AlertSink`]. Sinks are selected by a string tag from configuration:
//! - `stdout` (or unset): one JSON line on standard output
//! - `file`: one JSON line appended to a JSONL file
//! - `memory`: kept in process, for embedding and tests

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod emitter;
pub mod sinks;

pub use emitter::{emit, AlertEmitter};
pub use sinks::{build_sink, AlertSink, FileSink, MemorySink, SinkKind, StdoutSink};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::emitter::{emit, AlertEmitter};
    pub use crate::sinks::{
        build_sink, AlertSink, FileSink, MemorySink, SinkKind, StdoutSink, DEFAULT_EVENTS_FILE,
    };
}
