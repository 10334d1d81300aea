pub mod config;
pub mod extract;
pub mod qa;
pub mod report;
pub mod row;
pub mod stats;
pub mod time_parser;

pub use extract::{extract, Extraction};
pub use row::ResultRow;
pub use stats::{compute_dual, DualResult, ModeResult};
