//! Scan pipeline.
//!
//! The central orchestrator for one scan over a symbol universe:
//!
//! 1. **Fetch**: size each symbol's lookback from its strategies and pull
//!    history through the rate-limited data source, skipping symbols
//!    without data.
//! 2. **Evaluate**: preprocess each frame once and run its strategies on a
//!    bounded pool of blocking tasks.
//! 3. **Aggregate**: merge per-symbol hits into one list per strategy in
//!    universe order, independent of task completion order.
//! 4. **Sort**: order each list by the strategy's sort column.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::config::StrategyAssignment;
use super::progress::ProgressLogger;
use super::sort::sort_rows;
use crate::data::{FieldKey, HistoryFrame, MarketDataSource};
use crate::indicator::{ComputationError, IndicatorEngine};
use crate::strategy::{self, ResultRow, Strategy};

/// Extra bars requested beyond the longest strategy requirement, absorbing
/// provider short counts.
pub const LOOKBACK_PADDING: usize = 10;

// ============================================================================
// Scan Result
// ============================================================================

/// Name and description of a strategy that took part in a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub sort_key: String,
}

impl StrategyInfo {
    fn of(strategy: &dyn Strategy) -> Self {
        Self {
            name: strategy.name().to_string(),
            description: strategy.description().to_string(),
            sort_key: strategy.sort_key().to_string(),
        }
    }
}

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Scan ID (timestamp-based)
    pub id: String,
    /// Strategies in assignment order
    pub strategies: Vec<StrategyInfo>,
    /// Sorted hits per strategy name
    pub results: BTreeMap<String, Vec<ResultRow>>,
    /// Symbols handed to the pipeline
    pub symbols_requested: usize,
    /// Symbols with non-empty history
    pub symbols_with_data: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScanResult {
    /// An empty result for a run that had nothing to scan.
    pub fn empty(strategies: Vec<StrategyInfo>) -> Self {
        let now = Utc::now();
        Self {
            id: scan_id(now),
            strategies,
            results: BTreeMap::new(),
            symbols_requested: 0,
            symbols_with_data: 0,
            started_at: now,
            completed_at: now,
            duration_secs: 0.0,
        }
    }

    /// Hits for one strategy, best first.
    pub fn hits(&self, strategy: &str) -> &[ResultRow] {
        self.results.get(strategy).map_or(&[], Vec::as_slice)
    }

    /// Hits across all strategies.
    pub fn total_hits(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} of {} symbols in {:.1}s: {} hits across {} strategies",
            self.symbols_with_data,
            self.symbols_requested,
            self.duration_secs,
            self.total_hits(),
            self.strategies.len()
        )
    }
}

fn scan_id(at: DateTime<Utc>) -> String {
    format!("scan_{}", at.format("%Y%m%d_%H%M%S"))
}

// ============================================================================
// Single Symbol
// ============================================================================

/// Hits for one symbol as `(strategy name, row)` pairs.
pub type SymbolHits = Vec<(&'static str, ResultRow)>;

/// Bars to request for a symbol: longest requirement plus padding.
pub fn lookback_days(strategies: &[Arc<dyn Strategy>]) -> Option<usize> {
    strategies
        .iter()
        .map(|s| s.required_days())
        .max()
        .map(|days| days + LOOKBACK_PADDING)
}

/// Union of the fields `strategies` need, sorted.
pub fn required_fields(strategies: &[Arc<dyn Strategy>]) -> Vec<FieldKey> {
    let mut fields: Vec<FieldKey> = strategies
        .iter()
        .flat_map(|s| s.required_fields().iter().copied())
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

/// Preprocess `frame` once and run every strategy on it.
///
/// A failing or panicking strategy counts as no hit and does not affect
/// the others; a preprocessing failure fails the whole symbol.
pub fn scan_symbol(
    indicators: &IndicatorEngine,
    frame: &HistoryFrame,
    strategies: &[Arc<dyn Strategy>],
) -> Result<SymbolHits, ComputationError> {
    let symbol = frame.symbol();
    let enriched = indicators.preprocess(frame, &required_fields(strategies))?;

    let mut hits = Vec::new();
    for strategy in strategies {
        if enriched.len() < strategy.required_days() {
            debug!(
                symbol = %symbol,
                strategy = strategy.name(),
                bars = enriched.len(),
                needed = strategy.required_days(),
                "Not enough history"
            );
            continue;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            strategy::evaluate(strategy.as_ref(), &enriched)
        }));

        match outcome {
            Ok(Ok(Some(row))) => {
                info!(symbol = %symbol, strategy = strategy.name(), "Signal found");
                hits.push((strategy.name(), row));
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                warn!(
                    symbol = %symbol,
                    strategy = strategy.name(),
                    error = %e,
                    "Strategy evaluation failed"
                );
            }
            Err(_) => {
                error!(symbol = %symbol, strategy = strategy.name(), "Strategy panicked");
            }
        }
    }

    Ok(hits)
}

// ============================================================================
// Scan Pipeline
// ============================================================================

/// Runs the fetch / evaluate / aggregate / sort stages over a universe.
pub struct ScanPipeline {
    source: MarketDataSource,
    indicators: Arc<IndicatorEngine>,
    assignment: StrategyAssignment,
    max_workers: usize,
}

impl ScanPipeline {
    pub fn new(
        source: MarketDataSource,
        indicators: Arc<IndicatorEngine>,
        assignment: StrategyAssignment,
        max_workers: usize,
    ) -> Self {
        Self {
            source,
            indicators,
            assignment,
            max_workers: max_workers.max(1),
        }
    }

    /// Strategy metadata in assignment order.
    pub fn strategy_info(&self) -> Vec<StrategyInfo> {
        self.assignment
            .all_strategies()
            .iter()
            .map(|s| StrategyInfo::of(s.as_ref()))
            .collect()
    }

    /// Run a full scan over `symbols`.
    pub async fn run(&self, symbols: &[String]) -> ScanResult {
        let started_at = Utc::now();
        let id = scan_id(started_at);
        info!(scan_id = %id, symbols = symbols.len(), "Starting scan");

        let histories = self.fetch_histories(symbols).await;
        let symbols_with_data = histories.len();
        if histories.is_empty() && !symbols.is_empty() {
            error!(scan_id = %id, "No history fetched for any symbol");
        }

        let aggregated = self.evaluate(histories).await;
        let results = self.sort_results(aggregated);

        let completed_at = Utc::now();
        let result = ScanResult {
            id,
            strategies: self.strategy_info(),
            results,
            symbols_requested: symbols.len(),
            symbols_with_data,
            started_at,
            completed_at,
            duration_secs: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
        };
        info!(scan_id = %result.id, "{}", result.summary());
        result
    }

    /// Stage A: fetch each symbol's history, in universe order.
    ///
    /// Every request waits on the shared limiter, so issuing them one after
    /// another loses no throughput.
    pub async fn fetch_histories(&self, symbols: &[String]) -> Vec<HistoryFrame> {
        let total = symbols.len();
        if total == 0 {
            warn!("Symbol list is empty, nothing to fetch");
            return Vec::new();
        }
        info!(total, "Fetching histories");

        let mut progress = ProgressLogger::new("fetch", total);
        let mut histories = Vec::with_capacity(total);

        for (i, symbol) in symbols.iter().enumerate() {
            let strategies = self.assignment.for_symbol(symbol);
            match lookback_days(strategies) {
                None => warn!(symbol = %symbol, "No strategies assigned, skipping"),
                Some(days) => {
                    let frame = self.source.history(symbol, days).await;
                    if frame.is_empty() {
                        warn!(symbol = %symbol, "No history, skipping");
                    } else {
                        histories.push(frame);
                    }
                }
            }
            progress.log(i + 1);
        }

        info!(fetched = histories.len(), total, "History fetch complete");
        histories
    }

    /// Stages B and C: evaluate concurrently, then merge in input order.
    async fn evaluate(
        &self,
        histories: Vec<HistoryFrame>,
    ) -> BTreeMap<&'static str, Vec<ResultRow>> {
        info!(symbols = histories.len(), workers = self.max_workers, "Evaluating strategies");

        let mut slots: Vec<SymbolHits> = vec![Vec::new(); histories.len()];

        let tasks = histories.into_iter().enumerate().map(|(index, frame)| {
            let indicators = Arc::clone(&self.indicators);
            let strategies = self.assignment.for_symbol(frame.symbol()).to_vec();
            async move {
                let symbol = frame.symbol().to_string();
                let joined = tokio::task::spawn_blocking(move || {
                    scan_symbol(&indicators, &frame, &strategies)
                })
                .await;
                (index, symbol, joined)
            }
        });

        let mut completed = stream::iter(tasks).buffer_unordered(self.max_workers);
        while let Some((index, symbol, joined)) = completed.next().await {
            match joined {
                Ok(Ok(hits)) => slots[index] = hits,
                Ok(Err(e)) => warn!(symbol = %symbol, error = %e, "Preprocessing failed"),
                Err(e) => error!(symbol = %symbol, error = %e, "Scan task failed"),
            }
        }

        let mut aggregated: BTreeMap<&'static str, Vec<ResultRow>> = BTreeMap::new();
        for (name, row) in slots.into_iter().flatten() {
            aggregated.entry(name).or_default().push(row);
        }
        aggregated
    }

    /// Stage D: sort each strategy's hits by its declared column.
    fn sort_results(
        &self,
        mut aggregated: BTreeMap<&'static str, Vec<ResultRow>>,
    ) -> BTreeMap<String, Vec<ResultRow>> {
        let mut sorted = BTreeMap::new();
        for strategy in self.assignment.all_strategies() {
            if let Some(rows) = aggregated.remove(strategy.name()) {
                sorted.insert(
                    strategy.name().to_string(),
                    sort_rows(rows, strategy.sort_key(), strategy.sort_ascending()),
                );
            }
        }
        for name in aggregated.keys() {
            warn!(strategy = *name, "Hits for an unassigned strategy, dropping");
        }
        sorted
    }
}

// ============================================================================
// Tests
// ============================================================================
