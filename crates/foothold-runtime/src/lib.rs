//! `foothold-runtime` – the planning loop host.
//!
//! Wires configuration, terrain evaluation and cost-graph construction into
//! a single [`PlanningSession`] that a robot drives once per planning cycle.
//!
//! # Modules
//!
//! - [`config`] – [`TerrainConfig`][config::TerrainConfig]: TOML-backed
//!   settings (grid resolution, search areas, neighbouring window, features)
//!   with `FOOTHOLD_*` environment overrides and a JSON schema.
//! - [`session`] – [`PlanningSession`][session::PlanningSession]: owns the
//!   reward map and cost graph; every cycle is an instrumented
//!   `planning_cycle` span.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber. Set `OTEL_EXPORTER_OTLP_ENDPOINT` to export
//!   cycle spans to any OTLP-compatible collector.

pub mod config;
pub mod session;
pub mod telemetry;

pub use config::{FeatureSpec, TerrainConfig};
pub use session::{CycleSummary, PlanningSession};
pub use telemetry::{TracerProviderGuard, init_tracing};
