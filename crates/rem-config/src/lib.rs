pub mod manager;
pub mod types;

pub use manager::{ConfigError, ConfigManager, ConfigSource, CONFIG_FILE_NAME};
pub use types::{
    AnalysisSettings, LimitSettings, MetricsSettings, MetricsSource, RemConfig, DEFAULT_NPMS_URL,
};
