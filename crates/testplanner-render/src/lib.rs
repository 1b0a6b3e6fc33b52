//! Report writers for reconciled testplans
//!
//! Produces testplan documentation in Markdown, simulation results and
//! summary pages in Markdown or HTML, and CSV exports of the result tables.

pub mod doc;
pub mod error;
pub mod format;
pub mod renderer;
pub mod results;
pub mod summary;
pub mod table;

pub use error::{RenderError, Result};
pub use format::{escape_html, OutputFormat};
pub use renderer::{RenderConfig, Renderer};
pub use summary::SummaryEntry;
pub use table::{Align, Table};
