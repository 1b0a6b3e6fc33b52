//! Rendering errors

use crate::format::OutputFormat;
use testplanner_model::TestplanError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while writing reports
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Testplan(#[from] TestplanError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("Format {0:?} not supported for {1}")]
    UnsupportedFormat(OutputFormat, &'static str),
}
