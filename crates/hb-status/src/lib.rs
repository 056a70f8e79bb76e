//! # hb-status
//!
//! Read-only progress reporting for a search directory written by
//! `hb-writer`. Every call rescans the tree; nothing is cached.

mod probe;
mod report;

pub use probe::{probe_config, ConfigState, ConfigStatus, CONFIG_FILE, RESULT_FILE};
pub use report::{BracketStatus, RankedResult, SearchStatus, StatusCounts};
