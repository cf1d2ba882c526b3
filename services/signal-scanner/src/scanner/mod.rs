//! Scanner module.
//!
//! Turns a symbol universe into sorted per-strategy hit lists.
//!
//! # Flow
//!
//! ```text
//! listing ──► UniverseResolver ──► [Prefilter] ──► ScanPipeline ──► ScanReport
//!                                                   │
//!                                fetch ─► evaluate ─► aggregate ─► sort
//! ```

mod config;
mod engine;
mod prefilter;
mod progress;
mod report;
mod sort;
mod universe;

pub use config::{ScanConfig, StrategyAssignment};
pub use engine::{
    lookback_days, required_fields, scan_symbol, ScanPipeline, ScanResult, StrategyInfo, SymbolHits,
    LOOKBACK_PADDING,
};
pub use prefilter::{apply_prefilters, LiquidityFilter, Prefilter};
pub use progress::ProgressLogger;
pub use report::{ReportFormat, ScanReport};
pub use sort::sort_rows;
pub use universe::{parse_listing, select, UniverseResolver};
