//! Kernel traffic-control command emission (C9): translates channel metrics
//! into `tc` command sequences for both shaper operating modes, and applies
//! them with replace-not-mutate, failure-isolated semantics.

pub mod command;
pub mod emitter;
pub mod error;

pub use command::TcCommand;
pub use emitter::{
    apply_plan, build_point_to_point_plan, build_shared_bridge_plan, CommandExecutor,
    DefaultParams, PeerShaping, DEFAULT_DELAY_CORRELATION_PERCENT,
};
pub use error::ShaperError;
