pub mod config_error;
pub mod pipeline_error;

pub use config_error::ConfigError;
pub use pipeline_error::PipelineError;
