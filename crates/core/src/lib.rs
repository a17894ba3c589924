//! `waybill-core` — e-way-bill normalization and reconciliation engine.
//!
//! Pure engine crate: receives in-memory tables, returns transformed tables
//! plus structured counters. No CLI or IO dependencies.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod reconcile;
pub mod resolve;
pub mod store;
pub mod table;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use table::{Table, Value};
