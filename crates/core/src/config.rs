use serde::Deserialize;

/// Root configuration. Loaded from environment variables with the
/// prefix `CRM__`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-campaign sweeps.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_tick_secs() -> u64 {
    60
}
fn default_batch_size() -> usize {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl CrmConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CRM")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
