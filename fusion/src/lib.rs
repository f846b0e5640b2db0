//! Fusion of the vision and audio channels into one "hungry" signal.
//!
//! Both channels report into a single [`Coordinator`], which owns the
//! per-channel flags and both rate controllers and applies every change in
//! arrival order.

pub mod coordinator;
pub mod engine;
pub mod sink;

pub use coordinator::Coordinator;
pub use engine::{ChannelFlag, CompositeState, FusionEngine};
pub use sink::{BroadcastSink, EventSink};
