#![forbid(unsafe_code)]

//! Core: geometry, animation primitives, and hover affordance timing.

pub mod animation;
pub mod geometry;
pub mod hover;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, trace_span, warn};
