use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use swarm_env::SwarmEnvConfig;
use tracing::warn;

use super::seed::resolve_seed;
use super::slo::SloThresholds;
use crate::errors::{SwarmError, SwarmResult};
use crate::scenario::{LoadVariant, ScenarioProfile, ThinkTime, WeightedAction};
use crate::shape::{FixedLoad, ResolvedShape, Schedule, Stage};

/// One run, as written in a TOML file under `configs/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwarmConfig {
    pub variant: LoadVariant,
    /// Base URL like http://localhost:3000. Falls back to the env target.
    pub host: Option<String>,
    /// Fixed concurrency (shapeless runs only)
    pub users: Option<u32>,
    pub spawn_rate: Option<f64>,
    /// Shapeless runs stop after this long; None = until Ctrl-C
    pub run_time_secs: Option<f64>,
    /// Deterministic seed for the run (overrides SWARM_SEED env)
    pub seed: Option<u64>,
    /// Summary JSON path. Defaults to <results_directory>/swarm_summary_<ts>.json
    pub result_path: Option<String>,
    /// Overrides the variant's think time
    pub think_time: Option<ThinkTime>,
    /// Overrides the variant's stage list
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Overrides the default four-action mix
    #[serde(default)]
    pub actions: Vec<WeightedAction>,
    #[serde(default)]
    pub slo: SloThresholds,
    pub tick_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub stop_timeout_secs: Option<u64>,
}

impl SwarmConfig {
    pub fn from_toml_str(s: &str) -> SwarmResult<Self> {
        let cfg: SwarmConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> SwarmResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Minimal config for a variant with every knob left to defaults.
    pub fn for_variant(variant: LoadVariant) -> Self {
        Self {
            variant,
            host: None,
            users: None,
            spawn_rate: None,
            run_time_secs: None,
            seed: None,
            result_path: None,
            think_time: None,
            stages: Vec::new(),
            actions: Vec::new(),
            slo: SloThresholds::default(),
            tick_interval_ms: None,
            request_timeout_ms: None,
            stop_timeout_secs: None,
        }
    }

    /// Validates everything and produces the immutable plan for a run.
    pub fn resolve(&self, env: &SwarmEnvConfig) -> SwarmResult<RunPlan> {
        let think_time = self
            .think_time
            .unwrap_or_else(|| self.variant.think_time());
        let actions = if self.actions.is_empty() {
            ScenarioProfile::default_actions()
        } else {
            self.actions.clone()
        };
        let profile = ScenarioProfile::new(actions, think_time)?;

        let shape = self.resolve_shape()?;

        let base_url = self
            .host
            .clone()
            .unwrap_or_else(|| env.target.url())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SwarmError::configuration(format!(
                "host {} must start with http:// or https://",
                base_url
            )));
        }

        let tick_interval =
            Duration::from_millis(self.tick_interval_ms.unwrap_or(env.run.tick_interval_ms));
        if tick_interval.is_zero() {
            return Err(SwarmError::configuration("tick_interval_ms must be positive"));
        }

        let seed = resolve_seed(self.seed);
        let result_path = self
            .result_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                PathBuf::from(&env.run.results_directory).join(format!(
                    "swarm_summary_{}.json",
                    chrono::Utc::now().format("%Y%m%d_%H%M%S")
                ))
            });

        Ok(RunPlan {
            variant: self.variant,
            base_url,
            profile: Arc::new(profile),
            shape: Arc::new(shape),
            seed,
            tick_interval,
            request_timeout: Duration::from_millis(
                self.request_timeout_ms
                    .unwrap_or(env.http.request_timeout_ms),
            ),
            stop_timeout: Duration::from_secs(
                self.stop_timeout_secs.unwrap_or(env.run.stop_timeout_secs),
            ),
            user_agent: env.http.user_agent.clone(),
            result_path,
            slo: self.slo.clone(),
        })
    }

    fn resolve_shape(&self) -> SwarmResult<ResolvedShape> {
        if !self.stages.is_empty() {
            if self.users.is_some() || self.run_time_secs.is_some() {
                warn!("stages are set; users/run_time_secs are ignored");
            }
            return Ok(ResolvedShape::Staged(Schedule::new(self.stages.clone())?));
        }

        if let Some(schedule) = self.variant.default_schedule() {
            if self.users.is_some() || self.spawn_rate.is_some() || self.run_time_secs.is_some() {
                warn!(
                    "variant {} runs its own schedule; users/spawn_rate/run_time_secs are ignored",
                    self.variant.as_str()
                );
            }
            return Ok(ResolvedShape::Staged(schedule));
        }

        let users = self.users.ok_or_else(|| {
            SwarmError::configuration(format!(
                "variant {} has no schedule; set `users` (and optionally `run_time_secs`)",
                self.variant.as_str()
            ))
        })?;
        Ok(ResolvedShape::Fixed(FixedLoad::new(
            users,
            self.spawn_rate.unwrap_or(1.0),
            self.run_time_secs,
        )?))
    }
}

/// Everything a run needs, validated and frozen.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub variant: LoadVariant,
    pub base_url: String,
    pub profile: Arc<ScenarioProfile>,
    pub shape: Arc<ResolvedShape>,
    pub seed: u64,
    pub tick_interval: Duration,
    pub request_timeout: Duration,
    pub stop_timeout: Duration,
    pub user_agent: String,
    pub result_path: PathBuf,
    pub slo: SloThresholds,
}
