//! Execution state of one configuration, inferred from its directory.
//!
//! There is no execution log: the state is read off the files the runner
//! leaves behind. A `result` file is authoritative and checked first; any
//! file other than `config` without a result means the job started.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use hb_types::{HbResult, StatusError};
use serde::Serialize;

pub const CONFIG_FILE: &str = "config";
pub const RESULT_FILE: &str = "result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfigState {
    Pending,
    Running,
    Completed,
    Failed,
    /// Directory does not exist (not promoted into this stage yet).
    Unknown,
}

impl ConfigState {
    pub fn glyph(self) -> char {
        match self {
            Self::Pending => '.',
            Self::Running => 'R',
            Self::Completed => 'C',
            Self::Failed => 'F',
            Self::Unknown => '?',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfigStatus {
    pub state: ConfigState,
    /// Value read from the result file (a loss, non-finite on failure).
    pub result: Option<f64>,
}

impl ConfigStatus {
    fn of(state: ConfigState) -> Self {
        Self {
            state,
            result: None,
        }
    }
}

/// Classify the configuration stored in `dir`. Never modifies the directory.
pub fn probe_config(dir: &Path) -> HbResult<ConfigStatus> {
    if !dir.is_dir() {
        return Ok(ConfigStatus::of(ConfigState::Unknown));
    }

    let result_path = dir.join(RESULT_FILE);
    match fs::read_to_string(&result_path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                // created but not written yet
                return Ok(ConfigStatus::of(ConfigState::Running));
            }
            let value: f64 = trimmed.parse().map_err(|_| StatusError::MalformedResult {
                path: result_path.clone(),
                content: trimmed.to_string(),
            })?;
            let state = if value.is_finite() {
                ConfigState::Completed
            } else {
                ConfigState::Failed
            };
            return Ok(ConfigStatus {
                state,
                result: Some(value),
            });
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    for entry in fs::read_dir(dir)? {
        if entry?.file_name() != CONFIG_FILE {
            return Ok(ConfigStatus::of(ConfigState::Running));
        }
    }
    Ok(ConfigStatus::of(ConfigState::Pending))
}
