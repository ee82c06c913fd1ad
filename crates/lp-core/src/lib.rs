//! Core types, errors, and configuration for the live ingestion pipe.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - The [`Signal`] record model delivered downstream
//! - [`PipeConfig`] and [`WatchConfig`] with their defaults
//! - Error types for configuration and record validation
//! - Type aliases for `FxHashMap`/`FxHashSet` and the stable path hash used
//!   to name offset checkpoints

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{PipeConfig, WatchBackend, WatchConfig};
pub use error::{ConfigError, ValidationError};
pub use hash::{
    FxHashMap, FxHashSet, canonical_json_hash, fx_hash_map, fx_hash_set_with_capacity,
    stable_path_key,
};
pub use types::{SIDES, Signal};
