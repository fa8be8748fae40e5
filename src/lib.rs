//! leadgate - small-business lead discovery and qualification.
//!
//! Core library: normalization, fingerprint deduplication, the append-only
//! evidence ledger, the qualification gates and the orchestrator that ties
//! them to the persistent store.

pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod gates;
pub mod lookup;
pub mod migrations;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod repository;
pub mod schema;
