//! Signal Scanner Library
//!
//! Scans a universe of equity tickers against technical signal rules and
//! reports which tickers satisfy each rule on the latest daily bar.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        signal-scanner                               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Market Data    │  │  Indicator      │  │  Strategy       │     │
//! │  │  (rate limited) │─►│  Engine         │─►│  Evaluation     │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! │           ▲                                         │               │
//! │  ┌─────────────────┐                      ┌─────────────────┐      │
//! │  │  Universe +     │                      │  Aggregate,     │      │
//! │  │  Prefilter      │                      │  Sort, Report   │      │
//! │  └─────────────────┘                      └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Built-in Strategies
//!
//! - **VolumeSurgeStrategy**: today's dollar volume above twice its 60-day mean
//! - **MACrossStrategy**: MA5 crosses above MA10 on a liquid name
//! - **CDSignalStrategy**: MACD bottom divergence confirmed by a DIF/DEA cross
//!
//! The HTML rendering of each run can be emailed to a recipient list; see
//! [`notify`].

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicator;
pub mod notify;
pub mod scanner;
pub mod strategy;

use std::sync::Arc;

use anyhow::Result;
use scan_common::config::Config;
use tracing::{error, info};

use crate::data::{shared_limiter, HistoryProvider, MarketDataSource, YahooFinanceAdapter};
use crate::indicator::IndicatorEngine;
use crate::notify::{Delivery, EmailNotifier};
use crate::scanner::{
    apply_prefilters, LiquidityFilter, Prefilter, ScanConfig, ScanPipeline, ScanReport, ScanResult,
    UniverseResolver,
};

/// End-to-end scanner run: universe, prefilter, pipeline, report.
pub struct ScannerService {
    config: ScanConfig,
    source: MarketDataSource,
    resolver: UniverseResolver,
    pipeline: ScanPipeline,
    notifier: EmailNotifier,
}

impl ScannerService {
    /// Build the service against the Yahoo Finance provider.
    pub fn new(config: &Config) -> Result<Self> {
        let scan_config = ScanConfig::from_config(config)?;
        let provider = YahooFinanceAdapter::new(scan_config.timeout)?;
        Self::with_provider(scan_config, Arc::new(provider))
    }

    /// Build the service with any history provider.
    pub fn with_provider(config: ScanConfig, provider: Arc<dyn HistoryProvider>) -> Result<Self> {
        let limiter = shared_limiter(provider.name(), config.max_calls_per_sec);
        let source = MarketDataSource::new(provider, limiter);
        let resolver = UniverseResolver::new(config.listing_url.clone(), config.timeout)?;
        let pipeline = ScanPipeline::new(
            source.clone(),
            Arc::new(IndicatorEngine::with_builtin()),
            config.assignment.clone(),
            config.max_workers,
        );
        let notifier = EmailNotifier::new(config.email.clone(), config.timeout);

        info!(
            provider = source.provider_name(),
            workers = config.max_workers,
            calls_per_sec = config.max_calls_per_sec,
            assignment = ?config.assignment,
            email = config.email.enabled,
            "Scanner service initialized"
        );

        Ok(Self {
            config,
            source,
            resolver,
            pipeline,
            notifier,
        })
    }

    pub fn source(&self) -> &MarketDataSource {
        &self.source
    }

    /// Symbols to scan: targets or the full listing, prefiltered when
    /// scanning the full listing and the prefilter is enabled.
    pub async fn resolve_universe(&self) -> Vec<String> {
        let targets = &self.config.target_symbols;
        let symbols = self.resolver.resolve(targets).await;

        if !targets.is_empty() || !self.config.prefilter.enabled || symbols.is_empty() {
            return symbols;
        }

        let filters: Vec<Box<dyn Prefilter>> =
            vec![Box::new(LiquidityFilter::from_config(&self.config.prefilter))];
        apply_prefilters(&self.source, symbols, &filters).await
    }

    /// Full run: resolve the universe, then scan it.
    pub async fn run(&self) -> ScanResult {
        let symbols = self.resolve_universe().await;
        self.source.stats().log_summary("Prefilter");
        self.source.stats().reset();

        if symbols.is_empty() {
            error!("Symbol universe is empty, nothing to scan");
            return ScanResult::empty(self.pipeline.strategy_info());
        }

        self.run_on(&symbols).await
    }

    /// Scan an explicit symbol list.
    pub async fn run_on(&self, symbols: &[String]) -> ScanResult {
        let result = self.pipeline.run(symbols).await;
        self.source.stats().log_summary("Scan");
        result
    }

    /// Render a result in the configured format.
    pub fn render(&self, result: &ScanResult) -> String {
        ScanReport::new(result).generate(self.config.report_format)
    }

    /// Email the HTML report when email delivery is configured.
    pub async fn notify(&self, result: &ScanResult) -> Delivery {
        self.notifier.send(ScanReport::new(result).to_html()).await
    }
}
