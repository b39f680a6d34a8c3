use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use load_client::shape::ResolvedShape;
use load_client::swarm::config::SwarmConfig;
use load_client::swarm::run_swarm;
use load_client::LoggerManager;
use swarm_env::SwarmEnvConfig;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "juice_swarm",                     // 프로그램 이름
    version = env!("CARGO_PKG_VERSION"),      // 버전
    about = env!("CARGO_PKG_DESCRIPTION"),    // 짧은 설명
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a load test described by a TOML file
    Run {
        #[arg(long, short)]
        config: PathBuf,

        /// Target base URL, e.g. http://localhost:3000
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        /// Fixed concurrency for shapeless runs
        #[arg(long, short)]
        users: Option<u32>,

        #[arg(long)]
        spawn_rate: Option<f64>,

        /// Seconds before a shapeless run stops
        #[arg(long = "run-time")]
        run_time_secs: Option<f64>,
    },
    /// Print the resolved shape and action mix without sending traffic
    Plan {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Write a starter swarm.toml into the config directory
    InitConfig {
        /// Use the development preset (debug logging, 500ms ticks)
        #[arg(long)]
        dev: bool,

        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    swarm_env::init()?;
    let env = SwarmEnvConfig::global();
    let _logger = LoggerManager::setup(&env.logging);

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            host,
            seed,
            users,
            spawn_rate,
            run_time_secs,
        } => {
            let mut cfg = SwarmConfig::from_path(&config)
                .with_context(|| format!("failed to read {}", config.display()))?;
            // 커맨드라인 값이 파일 값을 덮어쓴다
            cfg.host = host.or(cfg.host);
            cfg.seed = seed.or(cfg.seed);
            cfg.users = users.or(cfg.users);
            cfg.spawn_rate = spawn_rate.or(cfg.spawn_rate);
            cfg.run_time_secs = run_time_secs.or(cfg.run_time_secs);

            let summary = run_swarm(cfg).await?;
            info!(
                "Run finished: {:?}, {} requests, {} failures, peak {} users",
                summary.stop_reason,
                summary.stats.total.requests,
                summary.stats.total.failures,
                summary.peak_users
            );
            if !summary.slo.passed {
                for line in &summary.slo.details {
                    warn!("  {}", line);
                }
                bail!("SLO failed");
            }
        }
        Command::Plan { config } => {
            let cfg = SwarmConfig::from_path(&config)
                .with_context(|| format!("failed to read {}", config.display()))?;
            let plan = cfg.resolve(env)?;

            println!("target: {}", plan.base_url);
            println!("seed:   {}", plan.seed);
            println!("shape:");
            for line in plan.shape.describe() {
                println!("  {}", line);
            }
            let tt = plan.profile.think_time_range();
            println!("think time: {}s - {}s", tt.lo, tt.hi);
            println!("actions (total weight {}):", plan.profile.total_weight());
            for wa in plan.profile.actions() {
                println!(
                    "  {:>3}  {:<28} {:>5.1}%",
                    wa.weight,
                    wa.action.label(),
                    wa.weight as f64 * 100.0 / plan.profile.total_weight() as f64
                );
            }
            if let ResolvedShape::Staged(schedule) = plan.shape.as_ref() {
                println!("peak: {} users", schedule.peak_users());
            }
        }
        Command::InitConfig { dev, force } => {
            let path = swarm_env::create_default_config(dev, force)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
