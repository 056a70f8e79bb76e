//! Minimal placeholder templates.
//!
//! `{{ path.to.value }}` is replaced by the value found at that path in a JSON
//! context. Strings are inserted verbatim, everything else as compact JSON.
//! Array elements are addressed by index (`brackets.0.stages`).

use std::path::Path;

use hb_types::{HbResult, TemplateError};
use serde_json::Value;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> HbResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or_else(|| TemplateError::Unterminated {
                    template: self.name.clone(),
                    offset: offset + start,
                })?;

            let key = after_open[..end].trim();
            let value = lookup(context, key).ok_or_else(|| TemplateError::MissingVariable {
                template: self.name.clone(),
                name: key.to_string(),
            })?;
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }

            let consumed = start + OPEN.len() + end + CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }
        out.push_str(rest);

        Ok(out)
    }
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
