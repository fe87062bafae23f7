//! Gateway implementations

mod builder;
mod latency;
mod orchestrator;

pub use builder::{GatewayBuilder, Tollgate};
pub use latency::LatencyModel;
pub use orchestrator::Gateway;
