//! # hb-generator
//!
//! Randomized configuration generation for hyperband searches.
//!
//! Provides search space definitions, a placeholder template renderer, and a
//! generator that produces the distinct stage-0 configurations of every
//! bracket under a bounded retry policy.

mod generator;
mod render;
mod space;
mod template;

pub use generator::{generate_configs, GeneratedConfig, GenerationPolicy, DEFAULT_MAX_RETRIES};
pub use render::{ConfigContext, ConfigRenderer, SpaceRenderer};
pub use space::{Assignment, Distribution, Hyperparameter, SearchSpace};
pub use template::Template;
