//! Materialization of a planned search on disk.

use std::fs;
use std::path::{Path, PathBuf};

use hb_generator::GeneratedConfig;
use hb_plan::HbSearch;
use hb_types::HbResult;
use serde_json::json;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::templates::{TemplateNames, TemplateSet};
use crate::workflow::workflow_brackets;

/// Where generated files go and how conflicts are handled.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Replace files that already exist.
    pub overwrite: bool,
    /// Directory the templates were loaded from; its other files are copied
    /// next to the generated ones.
    pub template_dir: Option<PathBuf>,
    pub template_names: TemplateNames,
}

impl WriterOptions {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>, names: TemplateNames) -> Self {
        self.template_dir = Some(dir.into());
        self.template_names = names;
        self
    }
}

/// What a single [`SearchWriter::write_search`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub copied: usize,
    pub skipped: usize,
    /// Overwrite warnings emitted, at most one per run.
    pub overwrite_warnings: usize,
}

#[derive(Debug)]
pub struct SearchWriter {
    templates: TemplateSet,
    options: WriterOptions,
}

impl SearchWriter {
    pub fn new(templates: TemplateSet, options: WriterOptions) -> Self {
        Self { templates, options }
    }

    /// Lay out the bracket/stage/config tree and the control files.
    pub fn write_search(
        &self,
        search: &HbSearch,
        configs: &[GeneratedConfig],
        output_dir: &Path,
    ) -> HbResult<WriteReport> {
        // render everything first so a template error leaves no partial tree behind
        let run = self.templates.run.render(&json!({ "search": search }))?;
        let base_dir = output_dir.display().to_string();
        let snakefile = self.templates.snakefile.render(&json!({
            "brackets": workflow_brackets(search),
            "base_dir": base_dir,
            "base_dir_json": serde_json::to_string(&base_dir)?,
            "search": search,
        }))?;

        fs::create_dir_all(output_dir)?;
        let mut report = WriteReport::default();

        for config in configs {
            let path = config_path(output_dir, config.bracket, 0, config.index).join("config");
            if self.write_file(&path, config.text.as_bytes(), &mut report)? {
                report.written += 1;
            }
        }

        let run_path = output_dir.join("run.sh");
        if self.write_file(&run_path, run.as_bytes(), &mut report)? {
            make_executable(&run_path)?;
            report.written += 1;
        }

        if self.write_file(&output_dir.join("Snakefile"), snakefile.as_bytes(), &mut report)? {
            report.written += 1;
        }

        if let Some(template_dir) = &self.options.template_dir {
            self.copy_support_files(template_dir, output_dir, &mut report)?;
        }

        info!(
            "Wrote {} file(s), copied {}, skipped {} existing",
            report.written, report.copied, report.skipped
        );
        Ok(report)
    }

    /// Write `contents` unless the file exists and overwriting is off.
    /// Returns whether the file was written.
    fn write_file(&self, path: &Path, contents: &[u8], report: &mut WriteReport) -> HbResult<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() && !self.options.overwrite {
            if report.overwrite_warnings == 0 {
                warn!("Not overwriting existing configuration file(s), warning only once");
                report.overwrite_warnings += 1;
            }
            debug!("Skipping existing {}", path.display());
            report.skipped += 1;
            return Ok(false);
        }

        fs::write(path, contents)?;
        Ok(true)
    }

    fn copy_support_files(
        &self,
        template_dir: &Path,
        output_dir: &Path,
        report: &mut WriteReport,
    ) -> HbResult<()> {
        let source = template_dir.canonicalize()?;
        let target = output_dir.canonicalize()?;

        let walker = WalkDir::new(&source)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.path().starts_with(&target));

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&source).unwrap_or(entry.path());
            if self.options.template_names.contains(relative) {
                continue;
            }

            let contents = fs::read(entry.path())?;
            if self.write_file(&target.join(relative), &contents, report)? {
                report.copied += 1;
            }
        }
        Ok(())
    }
}

/// `<output_dir>/bracket-<b>/stage-<s>/config-<c>`
pub fn config_path(output_dir: &Path, bracket: u32, stage: usize, config: u64) -> PathBuf {
    output_dir
        .join(format!("bracket-{bracket}"))
        .join(format!("stage-{stage}"))
        .join(format!("config-{config}"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
