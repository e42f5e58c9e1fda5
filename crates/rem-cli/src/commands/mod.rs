pub mod analyze;
pub mod config;

pub use analyze::AnalyzeArgs;
pub use config::{handle_config_command, ConfigCommand};
