//! Configuration module for save-scummer
//!
//! This module provides:
//! - Data directory resolution
//! - The persisted game store (sources, restore policy, save metadata)

pub mod paths;
pub mod store;

pub use paths::ScummerPaths;
pub use store::{GameEntry, GameStore};
