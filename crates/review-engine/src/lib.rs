//! Backend engine for a competitive-challenge review platform: weighted
//! score aggregation over scorecard hierarchies and phase-gated visibility
//! and mutation authorization for review records.

pub mod config;
pub mod error;
pub mod reviews;
pub mod telemetry;
