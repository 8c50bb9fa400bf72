pub mod api;
pub mod prediction;
pub mod range;
pub mod stats;
pub mod telemetry;
pub mod weather;
