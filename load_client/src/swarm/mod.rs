use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use swarm_env::SwarmEnvConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::SwarmResult;
use crate::shape::{LoadShape, Tick};
use crate::swarm::config::RunPlan;
use crate::swarm::controller::{Adjustment, SpawnPlanner};
use crate::swarm::manifest::{
    metrics_path_for, save_metrics_text, save_swarm_summary, StopReason, SwarmRunSummary,
};
use crate::swarm::population::Population;
use crate::swarm::seed::rng_for_user;
use crate::swarm::slo::evaluate_slo;
use crate::swarm::stats::{RequestStats, StatsSnapshot};
use crate::swarm::user::VirtualUser;

pub mod config;
pub mod controller;
pub mod manifest;
pub mod population;
pub mod seed;
pub mod slo;
pub mod stats;
pub mod user;

/// Resolves `cfg` against the global environment and drives one run to completion.
pub async fn run_swarm(cfg: config::SwarmConfig) -> anyhow::Result<SwarmRunSummary> {
    let plan = cfg.resolve(SwarmEnvConfig::global())?;
    run_plan(plan, cfg).await
}

pub async fn run_plan(plan: RunPlan, cfg: config::SwarmConfig) -> anyhow::Result<SwarmRunSummary> {
    info!(
        "Starting swarm: variant={}, target={}, seed={}, tick={:?}",
        plan.variant.as_str(),
        plan.base_url,
        plan.seed,
        plan.tick_interval
    );
    for line in plan.shape.describe() {
        info!("  {}", line);
    }

    let registry = Registry::new();
    if let Err(e) = swarm_metrics::register_custom_metrics(&registry) {
        warn!("Failed to register swarm metrics: {}", e);
    }

    let root = CancellationToken::new();
    let interrupt = {
        let root = root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping swarm");
                root.cancel();
            }
        })
    };

    let base_url: Arc<str> = Arc::from(plan.base_url.as_str());
    let stats = Arc::new(RequestStats::new());
    let mut planner = SpawnPlanner::new();
    let mut population = Population::new();
    let mut next_index = 0u64;
    let mut peak_users = 0usize;

    let started = Instant::now();
    let mut last_tick: Option<Instant> = None;
    let mut ticker = tokio::time::interval(plan.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stop_reason = loop {
        tokio::select! {
            _ = root.cancelled() => break StopReason::Cancelled,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let elapsed = now.duration_since(started).as_secs_f64();
        let dt = last_tick
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or_else(|| plan.tick_interval.as_secs_f64());
        last_tick = Some(now);

        let (target, spawn_rate) = match plan.shape.tick(elapsed) {
            Tick::Stop => {
                info!("Load shape finished at {:.1}s", elapsed);
                break StopReason::ShapeComplete;
            }
            Tick::Target { users, spawn_rate } => (users as usize, spawn_rate),
        };
        swarm_metrics::TARGET_USERS.set(target as i64);

        match planner.plan(population.len(), target, spawn_rate, dt) {
            Adjustment::Spawn(n) => {
                for _ in 0..n {
                    let cancel = root.child_token();
                    let client = match build_client(&plan) {
                        Ok(c) => c,
                        Err(e) => {
                            interrupt.abort();
                            root.cancel();
                            return Err(e.into());
                        }
                    };
                    let user = VirtualUser::new(
                        next_index,
                        client,
                        Arc::clone(&base_url),
                        Arc::clone(&plan.profile),
                        Arc::clone(&stats),
                        rng_for_user(plan.seed, next_index),
                        cancel.clone(),
                    );
                    let handle = tokio::spawn(user.run());
                    population.push(next_index, cancel, handle);
                    next_index += 1;
                    swarm_metrics::USERS_SPAWNED_TOTAL.inc();
                }
                debug!("spawned {} users ({} / {})", n, population.len(), target);
            }
            Adjustment::Stop(n) => {
                // 최근에 생성된 사용자부터 정리
                let stopped = population.stop_newest(n);
                swarm_metrics::USERS_STOPPED_TOTAL.inc_by(stopped.len() as u64);
                debug!(
                    "stopped users {:?} ({} / {})",
                    stopped,
                    population.len(),
                    target
                );
            }
            Adjustment::Hold => {}
        }

        swarm_metrics::ACTIVE_USERS.set(population.len() as i64);
        peak_users = peak_users.max(population.len());
    };

    interrupt.abort();
    root.cancel();
    let remaining = population.len();
    let users_stopped = population.stopped();
    drain_users(population.into_handles(), &plan).await;
    swarm_metrics::ACTIVE_USERS.set(0);
    swarm_metrics::TARGET_USERS.set(0);
    info!(
        "Swarm stopped ({:?}); {} users were still active",
        stop_reason, remaining
    );

    let duration_secs = started.elapsed().as_secs_f64();
    let snapshot = stats.snapshot();
    log_stats_table(&snapshot);

    let report = evaluate_slo(&snapshot, &plan.slo);
    if report.passed {
        info!(
            "SLO PASS: requests={}, failure_ratio={:.4}, p95={:?}ms",
            report.total_requests, report.failure_ratio, report.p95_ms
        );
    } else {
        warn!("SLO FAIL: {:?}", report.details);
    }

    let summary = SwarmRunSummary {
        timestamp: chrono::Utc::now(),
        seed: plan.seed,
        config: cfg,
        base_url: plan.base_url.clone(),
        shape: plan.shape.as_ref().clone(),
        stop_reason,
        duration_secs,
        peak_users,
        users_spawned: next_index,
        users_stopped,
        stats: snapshot,
        slo: report,
    };

    if let Err(e) = save_swarm_summary(&plan.result_path, &summary) {
        warn!(
            "Failed to save swarm summary to {}: {}",
            plan.result_path.display(),
            e
        );
    } else {
        info!("Saved swarm summary to {}", plan.result_path.display());
    }

    let metrics_path = metrics_path_for(&plan.result_path);
    match swarm_metrics::render_text(&registry) {
        Ok(text) => {
            if let Err(e) = save_metrics_text(&metrics_path, &text) {
                warn!("Failed to save metrics to {}: {}", metrics_path.display(), e);
            }
        }
        Err(e) => warn!("Failed to render metrics: {}", e),
    }

    Ok(summary)
}

/// Per-user session: own cookie jar and connection pool.
fn build_client(plan: &RunPlan) -> SwarmResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .timeout(plan.request_timeout)
        .user_agent(plan.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Waits for cancelled users to finish their in-flight request, up to
/// `stop_timeout`. Stragglers are aborted.
async fn drain_users(handles: Vec<JoinHandle<u64>>, plan: &RunPlan) {
    if handles.is_empty() {
        return;
    }
    let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
    let count = handles.len();

    match tokio::time::timeout(plan.stop_timeout, futures_util::future::join_all(handles)).await {
        Ok(results) => {
            let cycles: u64 = results.into_iter().filter_map(Result::ok).sum();
            debug!("{} users drained, {} cycles total", count, cycles);
        }
        Err(_) => {
            warn!(
                "{} users did not stop within {:?}; aborting",
                count, plan.stop_timeout
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

fn log_stats_table(snapshot: &StatsSnapshot) {
    info!(
        "{:<28} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "label", "reqs", "fails", "avg(ms)", "p95(ms)", "max(ms)"
    );
    for row in snapshot.labels.iter().chain(std::iter::once(&snapshot.total)) {
        info!(
            "{:<28} {:>8} {:>8} {:>10.1} {:>10.1} {:>10.1}",
            row.label,
            row.requests,
            row.failures,
            row.avg_ms.unwrap_or(0.0),
            row.p95_ms.unwrap_or(0.0),
            row.max_ms.unwrap_or(0.0)
        );
    }
}
