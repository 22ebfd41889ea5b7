//! Score aggregation, player classification, and the gated closure workflow
//! used to finalize youth evaluation camps.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
