//! The three templates a search is materialized with.

use std::path::Path;

use hb_generator::Template;
use hb_types::{config_error, HbResult, TemplateError};
use tracing::debug;

const BUILTIN_RUN: &str = include_str!("../templates/run.sh");
const BUILTIN_SNAKEFILE: &str = include_str!("../templates/Snakefile");

/// File names of the templates inside a template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNames {
    pub config: String,
    pub run: String,
    pub snakefile: String,
}

impl TemplateNames {
    pub fn contains(&self, relative: &Path) -> bool {
        [&self.config, &self.run, &self.snakefile]
            .iter()
            .any(|name| relative == Path::new(name.as_str()))
    }
}

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            config: "config".to_string(),
            run: "run.sh".to_string(),
            snakefile: "Snakefile".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateSet {
    /// `None` renders configurations as JSON documents.
    pub config: Option<Template>,
    pub run: Template,
    pub snakefile: Template,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self {
            config: None,
            run: Template::new("run.sh", BUILTIN_RUN),
            snakefile: Template::new("Snakefile", BUILTIN_SNAKEFILE),
        }
    }

    /// Load the templates from `dir`. The run and workflow templates are
    /// required, the config template is optional.
    pub fn load(dir: &Path, names: &TemplateNames) -> HbResult<Self> {
        if !dir.is_dir() {
            return Err(config_error!(
                "template directory {} does not exist",
                dir.display()
            ));
        }

        let required = |name: &str| -> HbResult<Template> {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(TemplateError::NotFound {
                    name: name.to_string(),
                    dir: dir.to_path_buf(),
                }
                .into());
            }
            Template::from_file(path)
        };

        let config_path = dir.join(&names.config);
        let config = if config_path.is_file() {
            Some(Template::from_file(config_path)?)
        } else {
            debug!(
                "No config template {} in {}, rendering configurations as JSON",
                names.config,
                dir.display()
            );
            None
        };

        Ok(Self {
            config,
            run: required(&names.run)?,
            snakefile: required(&names.snakefile)?,
        })
    }
}
