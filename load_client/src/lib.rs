pub mod errors;
pub mod scenario;
pub mod shape;
pub mod swarm;

use std::io;
use swarm_env::LoggingConfig;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct LoggerManager {
    _guard: WorkerGuard,
}

impl LoggerManager {
    pub fn setup(logging: &LoggingConfig) -> Self {
        // 1. 파일 로거 설정
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &logging.directory, &logging.filename);
        let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // 2. RUST_LOG 가 없으면 설정 파일의 레벨 사용
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        let file_layer = fmt::layer()
            .with_writer(non_blocking_file_writer)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!(
            "Logger initialized: console and file ({}/{})",
            logging.directory, logging.filename
        );

        Self { _guard: guard }
    }
}

/// Why a single virtual-user request did not succeed. Never fatal to the user
/// that issued it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestFailure {
    /// Response arrived with a non-2xx status
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("timed out: {0}")]
    Timeout(String),
    /// Could not reach the target (refused, DNS, reset)
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl RequestFailure {
    /// Stable short name, used as the `kind` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestFailure::Status(_) => "status",
            RequestFailure::Timeout(_) => "timeout",
            RequestFailure::Connection(_) => "connection",
            RequestFailure::Request(_) => "request",
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestFailure::Timeout(err.to_string())
        } else if err.is_connect() {
            RequestFailure::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            RequestFailure::Status(status.as_u16())
        } else {
            RequestFailure::Request(err.to_string())
        }
    }
}

/// Result of executing one action.
pub type ActionResult = Result<u16, RequestFailure>;
