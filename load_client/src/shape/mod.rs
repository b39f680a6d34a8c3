//! Load shapes: given elapsed run time, how many virtual users should be
//! running and how fast to get there.

use serde::{Deserialize, Serialize};

use crate::errors::{SwarmError, SwarmResult};

/// Controller output for one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Target { users: u32, spawn_rate: f64 },
    /// End the run.
    Stop,
}

/// Polled by the swarm controller on a fixed cadence.
///
/// Implementations must be pure functions of `elapsed_secs` and their own
/// immutable configuration so that concurrent polling needs no locking.
pub trait LoadShape: Send + Sync {
    fn tick(&self, elapsed_secs: f64) -> Tick;
}

/// One phase of a stepped ramp. `duration_secs` is cumulative from run start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub duration_secs: f64,
    pub users: u32,
    pub spawn_rate: f64,
}

impl Stage {
    pub const fn new(duration_secs: f64, users: u32, spawn_rate: f64) -> Self {
        Self {
            duration_secs,
            users,
            spawn_rate,
        }
    }
}

/// 10 stages, one per minute: 10 users warmup, then +25 users every minute.
const STRESS_STAGES: [Stage; 10] = [
    Stage::new(60.0, 10, 2.0),
    Stage::new(120.0, 35, 5.0),
    Stage::new(180.0, 60, 8.0),
    Stage::new(240.0, 85, 10.0),
    Stage::new(300.0, 110, 12.0),
    Stage::new(360.0, 135, 15.0),
    Stage::new(420.0, 160, 18.0),
    Stage::new(480.0, 185, 20.0),
    Stage::new(540.0, 210, 22.0),
    Stage::new(600.0, 235, 25.0),
];

/// Ordered, validated stage list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schedule {
    stages: Vec<Stage>,
}

impl Schedule {
    /// Fails on a non-increasing threshold, a non-positive or non-finite
    /// threshold, or a negative / non-finite spawn rate.
    pub fn new(stages: Vec<Stage>) -> SwarmResult<Self> {
        let mut previous: Option<f64> = None;
        for (index, stage) in stages.iter().enumerate() {
            if !stage.duration_secs.is_finite() || stage.duration_secs <= 0.0 {
                return Err(SwarmError::invalid_stage(
                    index,
                    format!(
                        "threshold {} must be a positive number of seconds",
                        stage.duration_secs
                    ),
                ));
            }
            if !stage.spawn_rate.is_finite() || stage.spawn_rate < 0.0 {
                return Err(SwarmError::invalid_stage(
                    index,
                    format!("spawn rate {} must be non-negative", stage.spawn_rate),
                ));
            }
            if let Some(prev) = previous {
                if stage.duration_secs <= prev {
                    return Err(SwarmError::invalid_stage(
                        index,
                        format!(
                            "threshold {} does not increase past {}",
                            stage.duration_secs, prev
                        ),
                    ));
                }
            }
            previous = Some(stage.duration_secs);
        }
        Ok(Self { stages })
    }

    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stress() -> Self {
        Self {
            stages: STRESS_STAGES.to_vec(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Threshold of the last stage, i.e. when `tick` starts returning `Stop`.
    pub fn total_duration_secs(&self) -> Option<f64> {
        self.stages.last().map(|s| s.duration_secs)
    }

    pub fn peak_users(&self) -> u32 {
        self.stages.iter().map(|s| s.users).max().unwrap_or(0)
    }
}

impl LoadShape for Schedule {
    fn tick(&self, elapsed_secs: f64) -> Tick {
        // NaN 도 여기서 걸러진다
        if !(elapsed_secs >= 0.0) {
            return Tick::Stop;
        }
        // declaration order: first stage still ahead of us wins
        self.stages
            .iter()
            .find(|stage| elapsed_secs < stage.duration_secs)
            .map(|stage| Tick::Target {
                users: stage.users,
                spawn_rate: stage.spawn_rate,
            })
            .unwrap_or(Tick::Stop)
    }
}

/// Constant concurrency, optionally bounded by a run time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedLoad {
    pub users: u32,
    pub spawn_rate: f64,
    /// None = run until cancelled
    pub run_time_secs: Option<f64>,
}

impl FixedLoad {
    pub fn new(users: u32, spawn_rate: f64, run_time_secs: Option<f64>) -> SwarmResult<Self> {
        if !spawn_rate.is_finite() || spawn_rate < 0.0 {
            return Err(SwarmError::configuration(format!(
                "spawn_rate {} must be non-negative",
                spawn_rate
            )));
        }
        if let Some(rt) = run_time_secs {
            if !rt.is_finite() || rt <= 0.0 {
                return Err(SwarmError::configuration(format!(
                    "run_time_secs {} must be positive",
                    rt
                )));
            }
        }
        Ok(Self {
            users,
            spawn_rate,
            run_time_secs,
        })
    }
}

impl LoadShape for FixedLoad {
    fn tick(&self, elapsed_secs: f64) -> Tick {
        if !(elapsed_secs >= 0.0) {
            return Tick::Stop;
        }
        match self.run_time_secs {
            Some(limit) if elapsed_secs >= limit => Tick::Stop,
            _ => Tick::Target {
                users: self.users,
                spawn_rate: self.spawn_rate,
            },
        }
    }
}

/// The shape a run was resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedShape {
    Staged(Schedule),
    Fixed(FixedLoad),
}

impl LoadShape for ResolvedShape {
    fn tick(&self, elapsed_secs: f64) -> Tick {
        match self {
            ResolvedShape::Staged(schedule) => schedule.tick(elapsed_secs),
            ResolvedShape::Fixed(fixed) => fixed.tick(elapsed_secs),
        }
    }
}

impl ResolvedShape {
    /// Human-readable plan, one line per phase.
    pub fn describe(&self) -> Vec<String> {
        match self {
            ResolvedShape::Staged(schedule) => {
                let mut from = 0.0;
                schedule
                    .stages()
                    .iter()
                    .map(|s| {
                        let line = format!(
                            "{:>7.1}s - {:>7.1}s  users={:<5} spawn_rate={}/s",
                            from, s.duration_secs, s.users, s.spawn_rate
                        );
                        from = s.duration_secs;
                        line
                    })
                    .collect()
            }
            ResolvedShape::Fixed(fixed) => {
                let until = fixed
                    .run_time_secs
                    .map(|rt| format!("{:.1}s", rt))
                    .unwrap_or_else(|| "cancelled".to_string());
                vec![format!(
                    "    0.0s - {}  users={} spawn_rate={}/s",
                    until, fixed.users, fixed.spawn_rate
                )]
            }
        }
    }
}
