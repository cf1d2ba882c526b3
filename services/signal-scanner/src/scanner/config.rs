//! Typed scan settings built from the shared configuration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use scan_common::config::{Config, EmailConfig, PrefilterConfig};
use tracing::warn;

use super::report::ReportFormat;
use crate::strategy::{catalog, Strategy};

// ============================================================================
// Strategy Assignment
// ============================================================================

/// Which strategies run on which symbol.
///
/// A symbol with an override entry runs exactly those strategies; every
/// other symbol runs the defaults.
#[derive(Clone, Default)]
pub struct StrategyAssignment {
    defaults: Vec<Arc<dyn Strategy>>,
    overrides: BTreeMap<String, Vec<Arc<dyn Strategy>>>,
}

impl StrategyAssignment {
    pub fn new(defaults: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Replace the strategy list for one symbol.
    pub fn with_override(
        mut self,
        symbol: impl Into<String>,
        strategies: Vec<Arc<dyn Strategy>>,
    ) -> Self {
        self.overrides.insert(symbol.into(), strategies);
        self
    }

    /// Strategies assigned to `symbol`.
    pub fn for_symbol(&self, symbol: &str) -> &[Arc<dyn Strategy>] {
        self.overrides
            .get(symbol)
            .map_or(self.defaults.as_slice(), Vec::as_slice)
    }

    /// Every assigned strategy, defaults first, de-duplicated by name.
    pub fn all_strategies(&self) -> Vec<Arc<dyn Strategy>> {
        let mut seen = Vec::new();
        let mut all = Vec::new();
        for strategy in self.defaults.iter().chain(self.overrides.values().flatten()) {
            if !seen.contains(&strategy.name()) {
                seen.push(strategy.name());
                all.push(Arc::clone(strategy));
            }
        }
        all
    }
}

impl std::fmt::Debug for StrategyAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |list: &[Arc<dyn Strategy>]| list.iter().map(|s| s.name()).collect::<Vec<_>>();
        f.debug_struct("StrategyAssignment")
            .field("defaults", &names(&self.defaults))
            .field(
                "overrides",
                &self
                    .overrides
                    .iter()
                    .map(|(k, v)| (k.as_str(), names(v)))
                    .collect::<BTreeMap<_, _>>(),
            )
            .finish()
    }
}

/// Resolve configured names, dropping unknown ones with a warning.
fn resolve(names: &[String]) -> Vec<Arc<dyn Strategy>> {
    names
        .iter()
        .filter_map(|name| {
            let strategy = catalog::build(name);
            if strategy.is_none() {
                warn!(strategy = %name, known = ?catalog::names(), "Unknown strategy, ignoring");
            }
            strategy
        })
        .collect()
}

// ============================================================================
// Scan Configuration
// ============================================================================

/// Settings for one scanner run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Stage B concurrency
    pub max_workers: usize,
    /// History requests per second
    pub max_calls_per_sec: u32,
    /// Provider request timeout
    pub timeout: Duration,
    /// Pipe-delimited listing of tradable symbols
    pub listing_url: String,
    /// Symbols to scan; empty means the whole listing
    pub target_symbols: Vec<String>,
    pub assignment: StrategyAssignment,
    pub report_format: ReportFormat,
    pub prefilter: PrefilterConfig,
    /// Report delivery after the run
    pub email: EmailConfig,
}

impl ScanConfig {
    /// Convert the raw configuration document.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let scanner = &config.scanner;

        let mut assignment = StrategyAssignment::new(resolve(&scanner.default_strategies));
        for (symbol, names) in &scanner.strategy_overrides {
            assignment = assignment.with_override(symbol.clone(), resolve(names));
        }

        let report_format = scanner
            .report_format
            .parse::<ReportFormat>()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            max_workers: scanner.max_workers.max(1),
            max_calls_per_sec: config.data_source.max_calls_per_sec.max(1),
            timeout: Duration::from_secs(config.data_source.timeout_secs),
            listing_url: config.data_source.listing_url.clone(),
            target_symbols: scanner.target_symbols.clone(),
            assignment,
            report_format,
            prefilter: scanner.prefilter.clone(),
            email: config.email.clone(),
        })
    }
}
