use thiserror::Error;

/// Configuration-time errors. Anything raised here aborts the run before the
/// first virtual user starts.
#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("Invalid schedule: stage {index} {reason}")]
    InvalidStage { index: usize, reason: String },

    #[error("Invalid scenario profile: {message}")]
    InvalidProfile { message: String },

    #[error("Invalid think time [{lo}, {hi}]: {reason}")]
    InvalidThinkTime { lo: f64, hi: f64, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse swarm config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read swarm config: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type SwarmResult<T> = Result<T, SwarmError>;

impl SwarmError {
    pub fn invalid_stage(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidStage {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
