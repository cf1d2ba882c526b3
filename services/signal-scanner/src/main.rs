//! Signal Scanner - daily technical signal scan over the NASDAQ listing.
//!
//! Loads `~/.stockscan/config.json` (or `SCAN_CONFIG`), runs one scan and
//! prints the report to stdout, then emails it when configured. Logs go to
//! stderr.

use anyhow::Result;
use scan_common::config::Config;
use scan_common::logging::init_logging;
use signal_scanner::ScannerService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load_with_env()?;
    config.validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Signal Scanner v{}", env!("CARGO_PKG_VERSION"));

    let service = ScannerService::new(&config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    let result = service.run().await;
    println!("{}", service.render(&result));
    service.notify(&result).await;

    Ok(())
}
