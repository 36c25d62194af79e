//! Orchestrator: process composition, periodic ticks, on-demand dispatch,
//! and shutdown coordination.

pub mod context;
pub mod dispatch;
pub mod ticks;

pub use context::CoreContext;
pub use dispatch::dispatch_on_demand;
