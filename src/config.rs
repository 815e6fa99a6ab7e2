//! Configuration
//!
//! clap argument groups with environment fallbacks. The binary flattens them
//! into its command line; library users may build them directly.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Args;
use rusty_money::iso;
use thiserror::Error;
use tracing::info;

use crate::{
    fixture::{FixtureError, FixturePricingService},
    flow::FlowSettings,
    http::{HttpPricingService, HttpServiceConfig},
    service::{PricingService, ServiceError},
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a service URL nor a fixture was given.
    #[error("no pricing service configured; set PRICING_SERVICE_URL or PRICING_FIXTURE")]
    MissingService,

    /// The currency code is not an ISO 4217 code.
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The fixture could not be loaded.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Pricing service settings.
#[derive(Debug, Args)]
pub struct ServiceConfig {
    /// Pricing service endpoint
    #[arg(long, env = "PRICING_SERVICE_URL", conflicts_with = "fixture")]
    pub service_url: Option<String>,

    /// YAML fixture to serve pricing data from instead of a remote service
    #[arg(long, env = "PRICING_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "PRICING_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Seed for fixture draws
    #[arg(long, env = "PRICING_SEED")]
    pub seed: Option<u64>,
}

impl ServiceConfig {
    /// Build the configured pricing service.
    ///
    /// # Errors
    ///
    /// Returns an error if no service is configured, the fixture cannot be
    /// loaded, or the HTTP client cannot be built.
    pub fn connect(&self) -> Result<Arc<dyn PricingService>, ConfigError> {
        if let Some(path) = &self.fixture {
            let service = FixturePricingService::from_path(path)?;

            let service = match self.seed {
                Some(seed) => service.with_seed(seed),
                None => service,
            };

            return Ok(Arc::new(service));
        }

        let Some(base_url) = &self.service_url else {
            return Err(ConfigError::MissingService);
        };

        info!(%base_url, "using remote pricing service");

        Ok(Arc::new(HttpPricingService::new(HttpServiceConfig {
            base_url: base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })?))
    }
}

/// Reveal timing and display settings.
#[derive(Debug, Args)]
pub struct RevealConfig {
    /// Milliseconds between reveal ticks
    #[arg(long, env = "REVEAL_TICK_MS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Full passes over the reel before it settles
    #[arg(long, env = "REVEAL_CYCLES", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub cycles: u32,

    /// Milliseconds to hold the winning entry before showing the result
    #[arg(long, env = "REVEAL_SETTLE_MS", default_value_t = 1_000)]
    pub settle_ms: u64,

    /// ISO 4217 currency used to display prices
    #[arg(long, env = "PRICING_CURRENCY", default_value = "USD")]
    pub currency: String,
}

impl RevealConfig {
    /// Flow settings for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] for an unrecognised code.
    pub fn settings(&self) -> Result<FlowSettings, ConfigError> {
        let code = self.currency.trim().to_uppercase();

        let currency = iso::find(&code).ok_or(ConfigError::UnknownCurrency(code))?;

        Ok(FlowSettings {
            tick: Duration::from_millis(self.tick_ms),
            full_cycles: self.cycles,
            settle_delay: Duration::from_millis(self.settle_ms),
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        service: ServiceConfig,

        #[command(flatten)]
        reveal: RevealConfig,
    }

    #[test]
    fn reveal_defaults() -> TestResult {
        let cli = TestCli::try_parse_from(["test", "--fixture", "demo.yml"])?;
        let settings = cli.reveal.settings()?;

        assert_eq!(settings.tick, Duration::from_millis(100));
        assert_eq!(settings.full_cycles, 5);
        assert_eq!(settings.settle_delay, Duration::from_secs(1));
        assert_eq!(settings.currency, iso::USD);

        Ok(())
    }

    #[test]
    fn rejects_zero_cycles() {
        assert!(TestCli::try_parse_from(["test", "--cycles", "0"]).is_err());
    }

    #[test]
    fn rejects_unknown_currencies() -> TestResult {
        let cli = TestCli::try_parse_from(["test", "--currency", "zzz"])?;

        assert!(matches!(
            cli.reveal.settings(),
            Err(ConfigError::UnknownCurrency(code)) if code == "ZZZ"
        ));

        Ok(())
    }

    #[test]
    fn a_service_is_required() -> TestResult {
        let cli = TestCli::try_parse_from(["test"])?;

        assert!(matches!(cli.service.connect(), Err(ConfigError::MissingService)));

        Ok(())
    }

    #[test]
    fn url_and_fixture_conflict() {
        assert!(
            TestCli::try_parse_from(["test", "--service-url", "http://x", "--fixture", "a.yml"])
                .is_err()
        );
    }
}
