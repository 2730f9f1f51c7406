pub mod classify;
pub mod config;
pub mod error;
pub mod fault;
pub mod normalize;
pub mod phase;
pub mod pipeline;
pub mod pose;
pub mod signal;

#[cfg(test)]
pub(crate) mod synthetic;

pub use config::Config;
pub use error::{AnalysisError, FaultError};
pub use pipeline::{SwingAnalysis, SwingAnalyzer};
