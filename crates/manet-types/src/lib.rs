//! Shared data model for the MANET channel and shaping pipeline.
//!
//! This crate holds only types and the invariants validated at load time; it
//! has no propagation math and no I/O. [`topology`] carries the declarative
//! network description, [`error`] carries the error kinds every downstream
//! crate propagates.

pub mod error;
pub mod ids;
pub mod topology;

pub use error::{ChannelError, ConfigError};
pub use ids::{InterfaceId, LinkId, NodeId};
pub use topology::{
    Antenna, AntennaPattern, CsmaParams, FecType, FixedNetem, Interface, InterfaceKind, MacModel,
    Modulation, ModulationScheme, Node, Polarization, SceneRef, SharedBridge, SlotMode,
    TdmaParams, Topology, WirelessParams,
};
