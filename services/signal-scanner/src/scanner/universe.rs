//! Symbol universe from the exchange listing file.
//!
//! The listing is pipe-delimited with a header row, for example:
//!
//! ```text
//! Symbol|Security Name|Market Category|Test Issue|Financial Status|Round Lot Size|ETF|NextShares
//! AAPL|Apple Inc. - Common Stock|Q|N|N|100|N|N
//! File Creation Time: 0412202418:01|||||||
//! ```

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{error, info, warn};

const SYMBOL_HEADER: &str = "Symbol";
const FOOTER_PREFIX: &str = "File Creation Time";

/// Extract the symbol column from a listing file.
pub fn parse_listing(text: &str) -> Result<Vec<String>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().context("Listing is empty")?;
    let Some(column) = header.split('|').position(|h| h.trim() == SYMBOL_HEADER) else {
        bail!("Listing has no {} column", SYMBOL_HEADER);
    };

    Ok(lines
        .filter(|line| !line.starts_with(FOOTER_PREFIX))
        .filter_map(|line| line.split('|').nth(column))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Narrow `listing` to `targets` when any are given.
///
/// Targets keep their own order; those absent from the listing and repeats
/// are dropped. With no targets the whole listing is returned.
pub fn select(listing: Vec<String>, targets: &[String]) -> Vec<String> {
    if targets.is_empty() {
        return listing;
    }

    let known: HashSet<&str> = listing.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| known.contains(t.as_str()) && seen.insert(t.as_str()))
        .cloned()
        .collect()
}

/// Downloads the listing and applies target selection.
pub struct UniverseResolver {
    client: reqwest::Client,
    listing_url: String,
}

impl UniverseResolver {
    pub fn new(listing_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build listing HTTP client")?;
        Ok(Self {
            client,
            listing_url: listing_url.into(),
        })
    }

    /// Download and parse the listing.
    pub async fn fetch_listing(&self) -> Result<Vec<String>> {
        info!(url = %self.listing_url, "Downloading symbol listing");

        let text = self
            .client
            .get(&self.listing_url)
            .send()
            .await
            .context("Listing request failed")?
            .error_for_status()
            .context("Listing request rejected")?
            .text()
            .await
            .context("Failed to read listing body")?;

        let symbols = parse_listing(&text)?;
        info!(count = symbols.len(), "Symbol listing loaded");
        Ok(symbols)
    }

    /// Symbols to scan; empty when the listing cannot be loaded.
    pub async fn resolve(&self, targets: &[String]) -> Vec<String> {
        let listing = match self.fetch_listing().await {
            Ok(listing) if !listing.is_empty() => listing,
            Ok(_) => {
                error!("Symbol listing is empty");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "Failed to load symbol listing");
                return Vec::new();
            }
        };

        let selected = select(listing, targets);
        if targets.is_empty() {
            info!(count = selected.len(), "No target symbols, scanning full listing");
        } else {
            if selected.len() < targets.len() {
                warn!(
                    requested = targets.len(),
                    valid = selected.len(),
                    "Some target symbols are not in the listing"
                );
            }
            info!(count = selected.len(), "Using target symbols");
        }
        selected
    }
}
