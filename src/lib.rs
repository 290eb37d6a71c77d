use thiserror::Error;
pub mod host;
pub mod oom_score;
pub mod plugin;
pub mod stack_string;
pub mod stub;
pub mod value;

#[cfg(test)]
mod capture;

pub use plugin::{OomScoreAdj, Plugin, TaskOutcome};
pub use value::{parse_adjustment, Adjustment};

/// Name the plugin registers under with its host.
pub const PLUGIN_NAME: &str = "oom-score-adj";

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    Plugin(#[from] plugin::Error),
    #[error("Failed to set up logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}
