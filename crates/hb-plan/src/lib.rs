//! # hb-plan
//!
//! Hyperband budget allocation.
//!
//! Turns `(eta, s_max)` into brackets of successive-halving stages: each stage
//! keeps a `1/eta` fraction of the configurations of the previous one and
//! multiplies their budget by `eta`. Pure computation, no I/O.
//!
//! Reference: Li et al. (2018) - Hyperband: A Novel Bandit-Based Approach.

mod params;
mod search;

pub use params::{unit_time_for, SearchParams};
pub use search::{Bracket, HbSearch, Stage};
