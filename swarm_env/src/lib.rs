use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Swarm 실행 환경 설정 (대상 서버, 로깅, HTTP, 실행 주기)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmEnvConfig {
    pub target: TargetEndpoint,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEndpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl TargetEndpoint {
    pub fn url(&self) -> String {
        let protocol = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", protocol, self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout applied to every virtual user's client.
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// How often the controller polls the load shape.
    pub tick_interval_ms: u64,
    /// Grace period for virtual users to finish after the run ends.
    pub stop_timeout_secs: u64,
    pub results_directory: String,
}

impl Default for SwarmEnvConfig {
    fn default() -> Self {
        Self {
            target: TargetEndpoint {
                host: "localhost".to_string(),
                port: 3000,
                use_tls: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                filename: "swarm.log".to_string(),
            },
            http: HttpConfig {
                request_timeout_ms: 15_000,
                user_agent: "juice-swarm/0.1".to_string(),
            },
            run: RunConfig {
                tick_interval_ms: 1_000,
                stop_timeout_secs: 10,
                results_directory: "logs".to_string(),
            },
        }
    }
}

static CONFIG: Lazy<SwarmEnvConfig> = Lazy::new(|| {
    SwarmEnvConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load swarm env config: {}. Using defaults.", e);
        SwarmEnvConfig::default()
    })
});

impl SwarmEnvConfig {
    /// 전역 설정 인스턴스 가져오기
    pub fn global() -> &'static SwarmEnvConfig {
        &CONFIG
    }

    /// defaults → swarm.toml (선택) → SWARM__ 환경 변수 순서로 병합
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = Self::config_path();

        info!("Loading swarm env configuration from: {:?}", config_file);

        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(config_file).required(false))
            // e.g. SWARM__TARGET__PORT=8080
            .add_source(Environment::with_prefix("SWARM").separator("__"))
            .build()?;

        let config: SwarmEnvConfig = settings.try_deserialize()?;
        debug!("Loaded swarm env configuration: {:?}", config);
        Ok(config)
    }

    /// `swarm.toml` 위치에 현재 설정을 기록하고 그 경로를 돌려준다
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::get_config_dir();
        std::fs::create_dir_all(&config_dir)?;

        let config_file = Self::config_path();
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(&config_file, toml_string)?;

        Ok(config_file)
    }

    pub fn config_path() -> PathBuf {
        Self::get_config_dir().join("swarm.toml")
    }

    fn get_config_dir() -> PathBuf {
        if let Ok(config_home) = std_env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_home).join("juice_swarm")
        } else if let Some(home_dir) = dirs::home_dir() {
            home_dir.join(".config").join("juice_swarm")
        } else {
            PathBuf::from("./config")
        }
    }

    /// 로컬 디버깅용: 상세 로그, 짧은 폴링 주기
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.run.tick_interval_ms = 500;
        config
    }

    /// 테스트용: 짧은 타임아웃, 빠른 종료
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.logging.level = "trace".to_string();
        config.http.request_timeout_ms = 2_000;
        config.run.tick_interval_ms = 100;
        config.run.stop_timeout_secs = 2;
        config
    }
}

/// 설정 초기화 함수
pub fn init() -> Result<()> {
    dotenv::dotenv().ok();

    let config = SwarmEnvConfig::global();
    info!("Swarm env configuration initialized");
    debug!("Configuration: {:?}", config);

    Ok(())
}

/// Writes a starter `swarm.toml` (the development preset when `dev` is set).
/// Refuses to overwrite an existing file unless `force` is given.
pub fn create_default_config(dev: bool, force: bool) -> Result<PathBuf> {
    let path = SwarmEnvConfig::config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = if dev {
        SwarmEnvConfig::development()
    } else {
        SwarmEnvConfig::default()
    };
    let path = config.save()?;
    info!("Default swarm env configuration file created at {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_target_endpoint_url() {
        let endpoint = TargetEndpoint {
            host: "localhost".to_string(),
            port: 3000,
            use_tls: false,
        };
        assert_eq!(endpoint.url(), "http://localhost:3000");

        let tls = TargetEndpoint {
            host: "shop.example".to_string(),
            port: 443,
            use_tls: true,
        };
        assert_eq!(tls.url(), "https://shop.example:443");
    }

    #[test]
    fn test_defaults_point_at_local_shop() {
        let cfg = SwarmEnvConfig::default();
        assert_eq!(cfg.target.url(), "http://localhost:3000");
        assert_eq!(cfg.run.tick_interval_ms, 1_000);
        assert_eq!(cfg.http.request_timeout_ms, 15_000);
    }

    #[test]
    fn test_config_environments() {
        let dev = SwarmEnvConfig::development();
        assert_eq!(dev.logging.level, "debug");

        let testing = SwarmEnvConfig::testing();
        assert_eq!(testing.logging.level, "trace");
        assert!(testing.run.tick_interval_ms < dev.run.tick_interval_ms);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let cfg = SwarmEnvConfig::development();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: SwarmEnvConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.logging.level, "debug");
        assert_eq!(back.target.port, cfg.target.port);
    }

    fn with_config_home<F: FnOnce(&std::path::Path)>(name: &str, f: F) {
        let home = std::env::temp_dir().join(format!("juice_swarm_env_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&home);
        let previous = std_env::var_os("XDG_CONFIG_HOME");
        std_env::set_var("XDG_CONFIG_HOME", &home);
        f(&home);
        match previous {
            Some(v) => std_env::set_var("XDG_CONFIG_HOME", v),
            None => std_env::remove_var("XDG_CONFIG_HOME"),
        }
        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    #[serial]
    fn test_init_config_writes_loadable_file() {
        with_config_home("init", |home| {
            let path = create_default_config(true, false).unwrap();
            assert_eq!(path, home.join("juice_swarm").join("swarm.toml"));

            let loaded = SwarmEnvConfig::load().unwrap();
            assert_eq!(loaded.logging.level, "debug");
            assert_eq!(loaded.run.tick_interval_ms, 500);

            // 이미 있으면 --force 없이는 덮어쓰지 않는다
            assert!(create_default_config(false, false).is_err());
            create_default_config(false, true).unwrap();
            assert_eq!(SwarmEnvConfig::load().unwrap().logging.level, "info");
        });
    }

    #[test]
    #[serial]
    fn test_env_vars_override_defaults() {
        with_config_home("env", |_| {
            std_env::set_var("SWARM__TARGET__PORT", "8080");
            std_env::set_var("SWARM__HTTP__USER_AGENT", "bench-agent");
            let loaded = SwarmEnvConfig::load();
            std_env::remove_var("SWARM__TARGET__PORT");
            std_env::remove_var("SWARM__HTTP__USER_AGENT");

            let loaded = loaded.unwrap();
            assert_eq!(loaded.target.port, 8080);
            assert_eq!(loaded.http.user_agent, "bench-agent");
            assert_eq!(loaded.target.host, "localhost");
        });
    }
}
