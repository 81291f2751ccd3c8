//! Orchestrator and HTTP control surface (C10/C11, §4.9-§4.10).

pub mod api;
pub mod config;
pub mod container;
pub mod error;
pub mod executor;
pub mod recompute;
pub mod state;

pub use config::Config;
pub use container::{ContainerBackend, StaticContainerBackend};
pub use error::ApiError;
pub use state::AppState;
