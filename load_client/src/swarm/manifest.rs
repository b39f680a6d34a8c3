use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::config::SwarmConfig;
use super::slo::SloReport;
use super::stats::StatsSnapshot;
use crate::shape::ResolvedShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The shape returned Stop (schedule exhausted or run time elapsed)
    ShapeComplete,
    /// Operator interrupt
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwarmRunSummary {
    pub timestamp: DateTime<Utc>,
    pub seed: u64,
    pub config: SwarmConfig,
    pub base_url: String,
    pub shape: ResolvedShape,
    pub stop_reason: StopReason,
    pub duration_secs: f64,
    pub peak_users: usize,
    pub users_spawned: u64,
    /// Users stopped while ramping down, before the run ended
    pub users_stopped: u64,
    pub stats: StatsSnapshot,
    pub slo: SloReport,
}

pub fn save_swarm_summary(path: &Path, summary: &SwarmRunSummary) -> Result<()> {
    let payload = serde_json::to_vec_pretty(summary)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).ok();
    }
    std::fs::write(path, payload)?;
    Ok(())
}

/// `<summary>.prom` next to the summary file.
pub fn metrics_path_for(summary_path: &Path) -> PathBuf {
    summary_path.with_extension("prom")
}

pub fn save_metrics_text(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).ok();
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_file_sits_next_to_summary() {
        let p = metrics_path_for(Path::new("logs/swarm_summary_20260101_000000.json"));
        assert_eq!(p, PathBuf::from("logs/swarm_summary_20260101_000000.prom"));
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        let v = serde_json::to_value(StopReason::ShapeComplete).unwrap();
        assert_eq!(v, serde_json::json!("shape_complete"));
    }
}
