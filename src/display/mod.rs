//! Display formatting for terminal output
//!
//! Provides utilities for formatting games and backups for terminal display.

pub mod format;
pub mod game;

pub use format::{format_elapsed, format_size, format_timestamp};
pub use game::{format_game_details, format_game_list};
