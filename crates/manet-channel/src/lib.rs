//! Channel modeling core: link budget, modulation/MCS, path loss,
//! interference aggregation, SINR, MAC statistical models, and the per-link
//! pipeline that ties them together (C1-C8, C12).

pub mod cache;
pub mod interference;
pub mod linkbudget;
pub mod mac;
pub mod mcs;
pub mod modulation;
pub mod pathsolver;
pub mod pipeline;
pub mod sinr;

pub use cache::{PathCache, PathCacheKey};
pub use interference::{compute_interference, InterferenceOutcome, InterferenceTerm, Interferer};
pub use linkbudget::{db_to_linear, distance_3d, fspl, linear_to_db, rx_power_dbm, thermal_noise};
pub use mac::{estimate_communication_range, MacInterferer};
pub use mcs::{McsEntry, McsTable};
pub use pathsolver::{
    resolve_engine, EngineSelection, FsplFallback, PathDetails, PathResult, PathSolver, ProcessMode,
};
pub use pipeline::{compute_batch, ChannelMetrics, LinkEndpoint, LinkSpec};
pub use sinr::{compute_sinr, Regime, SinrInput, SinrResult};
