use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Knobs for the planning coordinator. Unknown keys in the sources are
/// ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    /// Wall-clock budget for one planning request, in milliseconds.
    #[serde(default = "default_plan_deadline_ms")]
    pub plan_deadline_ms: u64,
    /// Search-tree entries between cancellation polls; 0 disables polling.
    #[serde(default = "default_cancel_check_interval")]
    pub cancel_check_interval: u32,
}

impl PlannerConfig {
    pub fn plan_deadline(&self) -> Duration {
        Duration::from_millis(self.plan_deadline_ms)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            plan_deadline_ms: default_plan_deadline_ms(),
            cancel_check_interval: default_cancel_check_interval(),
        }
    }
}

fn default_plan_deadline_ms() -> u64 {
    3_000
}

fn default_cancel_check_interval() -> u32 {
    porter_core::planner::DEFAULT_CHECK_INTERVAL
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration file, then the per-environment and local
            // overrides, none of which have to exist.
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Environment wins, e.g. PORTER__DATABASE__URL.
            .add_source(config::Environment::with_prefix("PORTER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
