use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct GradingApiSettings {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub tick_interval_ms: u64,
    pub low_time_warning_seconds: u32,
    /// Screens untouched for this long (and with no open timer stream) are unmounted.
    pub screen_idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            low_time_warning_seconds: 60,
            screen_idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub grading_api: GradingApiSettings,
    pub engine: EngineSettings,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let listen_addr = settings
            .get_string("server.listen_addr")
            .or_else(|_| env::var("LISTEN_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8082".to_string());

        let base_url = settings
            .get_string("grading_api.base_url")
            .or_else(|_| env::var("GRADING_API_URL"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: GRADING_API_URL must be set in production!");
                }
                "http://localhost:8000/api/v1".to_string()
            });

        let api_token = settings
            .get_string("grading_api.token")
            .or_else(|_| env::var("GRADING_API_TOKEN"))
            .ok()
            .filter(|token| !token.is_empty());

        let timeout_ms = settings
            .get_int("grading_api.timeout_ms")
            .ok()
            .map(|v| v as u64)
            .or_else(|| parse_env("GRADING_API_TIMEOUT_MS"))
            .filter(|v| *v > 0)
            .unwrap_or(5000);

        let defaults = EngineSettings::default();
        let tick_interval_ms = settings
            .get_int("engine.tick_interval_ms")
            .ok()
            .map(|v| v as u64)
            .or_else(|| parse_env("TICK_INTERVAL_MS"))
            .filter(|v| *v > 0)
            .unwrap_or(defaults.tick_interval_ms);

        let low_time_warning_seconds = settings
            .get_int("engine.low_time_warning_seconds")
            .ok()
            .map(|v| v as u32)
            .or_else(|| parse_env("LOW_TIME_WARNING_SECONDS"))
            .unwrap_or(defaults.low_time_warning_seconds);

        let screen_idle_timeout_secs = settings
            .get_int("engine.screen_idle_timeout_secs")
            .ok()
            .map(|v| v as u64)
            .or_else(|| parse_env("SCREEN_IDLE_TIMEOUT_SECS"))
            .filter(|v| *v > 0)
            .unwrap_or(defaults.screen_idle_timeout_secs);

        let sweep_interval_secs = settings
            .get_int("engine.sweep_interval_secs")
            .ok()
            .map(|v| v as u64)
            .or_else(|| parse_env("SCREEN_SWEEP_INTERVAL_SECS"))
            .filter(|v| *v > 0)
            .unwrap_or(defaults.sweep_interval_secs);

        Ok(Config {
            listen_addr,
            grading_api: GradingApiSettings {
                base_url,
                api_token,
                timeout_ms,
            },
            engine: EngineSettings {
                tick_interval_ms,
                low_time_warning_seconds,
                screen_idle_timeout_secs,
                sweep_interval_secs,
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
