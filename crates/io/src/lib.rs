//! File I/O for the pipeline: Excel and CSV import, highlighted Excel
//! export, and the on-disk session store.
//!
//! Import is one-way: files become in-memory tables. Export is a
//! presentation snapshot for sharing, not a round-trip format.

pub mod csv;
pub mod store;
pub mod xlsx;

pub use store::FileStore;
