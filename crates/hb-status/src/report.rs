//! Per-bracket and per-search status aggregation.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hb_types::{HbResult, StatusError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::probe::{probe_config, ConfigState, ConfigStatus};

/// Glyphs per grid row and per group within a row.
const ROW_WIDTH: usize = 25;
const GROUP_WIDTH: usize = 5;
const TOP_RESULTS: usize = 3;
/// Config indices at or above this multiple of the number of present
/// config directories are treated as stray and left out of the slots.
const SLOT_SPREAD: u64 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
    pub pending: usize,
    pub unknown: usize,
}

impl StatusCounts {
    fn record(&mut self, state: ConfigState) {
        match state {
            ConfigState::Completed => self.completed += 1,
            ConfigState::Failed => self.failed += 1,
            ConfigState::Running => self.running += 1,
            ConfigState::Pending => self.pending += 1,
            ConfigState::Unknown => self.unknown += 1,
        }
    }

    /// Configurations whose directory exists.
    pub fn total(&self) -> usize {
        self.completed + self.failed + self.running + self.pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedResult {
    /// 1-based.
    pub rank: usize,
    pub loss: f64,
    pub config: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketStatus {
    pub id: u32,
    /// Highest `stage-N` directory present.
    pub current_stage: Option<usize>,
    /// Slot `i` holds `config-i` of the current stage.
    pub configs: Vec<ConfigStatus>,
    pub counts: StatusCounts,
}

impl BracketStatus {
    pub fn scan(id: u32, dir: &Path) -> HbResult<Self> {
        let current = numbered_dirs::<usize>(dir, "stage")?.pop();
        let mut configs = Vec::new();
        let mut counts = StatusCounts::default();

        if let Some((_, stage_dir)) = &current {
            let present = numbered_dirs::<u64>(stage_dir, "config")?;
            let limit = present.len() as u64 * SLOT_SPREAD;
            let (kept, stray): (Vec<_>, Vec<_>) =
                present.into_iter().partition(|(index, _)| *index < limit);
            for (_, path) in &stray {
                warn!("Ignoring stray configuration directory {}", path.display());
            }

            if let Some(highest) = kept.last().map(|(index, _)| *index) {
                for index in 0..=highest {
                    let status = probe_config(&stage_dir.join(format!("config-{index}")))?;
                    counts.record(status.state);
                    configs.push(status);
                }
            }
        }

        debug!(
            "Bracket {}: {} configuration slot(s) in stage {:?}",
            id,
            configs.len(),
            current.as_ref().map(|(stage, _)| stage)
        );

        Ok(Self {
            id,
            current_stage: current.map(|(stage, _)| stage),
            configs,
            counts,
        })
    }

    /// Best completed configurations, lowest loss first.
    pub fn top(&self, count: usize) -> Vec<RankedResult> {
        let mut completed: Vec<(u64, f64)> = self
            .configs
            .iter()
            .enumerate()
            .filter(|(_, status)| status.state == ConfigState::Completed)
            .filter_map(|(index, status)| status.result.map(|loss| (index as u64, loss)))
            .collect();
        completed.sort_by(|a, b| a.1.total_cmp(&b.1));

        completed
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, (config, loss))| RankedResult {
                rank: i + 1,
                loss,
                config,
            })
            .collect()
    }
}

impl fmt::Display for BracketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(stage) = self.current_stage else {
            return writeln!(f, "Bracket {} - no stages yet", self.id);
        };

        // stages are counted from 1 on the second line
        let c = &self.counts;
        writeln!(f, "Bracket {} - Stages completed: {}", self.id, stage)?;
        writeln!(f, "  Stage {} - {} configurations", stage + 1, c.total())?;
        writeln!(
            f,
            "    | Completed (C) | Failed (F) | In progress (R) | Pending (.) | Total |"
        )?;
        writeln!(
            f,
            "    | {:>13} | {:>10} | {:>15} | {:>11} | {:>5} |",
            c.completed,
            c.failed,
            c.running,
            c.pending,
            c.total()
        )?;

        for (row, chunk) in self.configs.chunks(ROW_WIDTH).enumerate() {
            let groups: Vec<String> = chunk
                .chunks(GROUP_WIDTH)
                .map(|group| group.iter().map(|s| s.state.glyph()).collect())
                .collect();
            writeln!(f, " {:>5}  {}", row * ROW_WIDTH, groups.join(" "))?;
        }

        let top = self.top(TOP_RESULTS);
        if !top.is_empty() {
            writeln!(f)?;
            writeln!(f, "  Top completed configuration(s):")?;
            for entry in top {
                writeln!(
                    f,
                    "    {}. {:.4} - Conf. {}",
                    entry.rank, entry.loss, entry.config
                )?;
            }
        }
        Ok(())
    }
}

/// Status of every bracket of a search, recomputed from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStatus {
    pub brackets: Vec<BracketStatus>,
}

impl SearchStatus {
    pub fn scan(search_dir: &Path) -> HbResult<Self> {
        if !search_dir.is_dir() {
            return Err(StatusError::SearchNotFound {
                path: search_dir.to_path_buf(),
            }
            .into());
        }

        let brackets = numbered_dirs::<u32>(search_dir, "bracket")?
            .into_iter()
            .map(|(id, dir)| BracketStatus::scan(id, &dir))
            .collect::<HbResult<Vec<_>>>()?;

        Ok(Self { brackets })
    }

    pub fn counts(&self) -> StatusCounts {
        self.brackets
            .iter()
            .fold(StatusCounts::default(), |mut acc, bracket| {
                acc.completed += bracket.counts.completed;
                acc.failed += bracket.counts.failed;
                acc.running += bracket.counts.running;
                acc.pending += bracket.counts.pending;
                acc.unknown += bracket.counts.unknown;
                acc
            })
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.brackets.is_empty() {
            return writeln!(f, "No brackets found");
        }
        for bracket in &self.brackets {
            writeln!(f, "{bracket}")?;
        }
        Ok(())
    }
}

/// Subdirectories named `<prefix>-<N>` with `N` in canonical decimal form,
/// sorted by `N`. A missing `dir` yields nothing.
fn numbered_dirs<N>(dir: &Path, prefix: &str) -> HbResult<Vec<(N, PathBuf)>>
where
    N: FromStr + ToString + Ord,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(number) = name
            .to_str()
            .and_then(|n| n.strip_prefix(prefix))
            .and_then(|n| n.strip_prefix('-'))
            .and_then(|digits| {
                let number = digits.parse::<N>().ok()?;
                (number.to_string() == digits).then_some(number)
            })
        else {
            continue;
        };
        if entry.file_type()?.is_dir() {
            found.push((number, entry.path()));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}
