//! # hb-writer
//!
//! Writes a planned hyperband search to disk: one directory per bracket with
//! the generated stage-0 configurations, a workflow definition for the
//! external runner, and a run script.

mod templates;
mod workflow;
mod writer;

pub use templates::{TemplateNames, TemplateSet};
pub use workflow::{workflow_brackets, WorkflowBracket, WorkflowStage};
pub use writer::{config_path, SearchWriter, WriteReport, WriterOptions};
