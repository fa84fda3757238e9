// Domain layer - pure types and computations, no I/O
pub mod axis;
pub mod device;
pub mod error;
pub mod export;
pub mod normalize;
pub mod telemetry;
pub mod time_range;
pub mod units;
