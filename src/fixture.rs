//! Fixture pricing service.
//!
//! An in-process [`PricingService`] loaded from a YAML file. It performs the
//! weighted draw itself, which makes it useful for demos and for running the
//! binary without a backend.
//!
//! ```yaml
//! admin_password: letmein
//! multipliers:
//!   - { multiplier: 1.0, probability: 50 }
//!   - { multiplier: 2.0, probability: 30 }
//! sales_options:
//!   - { number: 1, name: Widget, cost: "4.50", selling_price: "10.00" }
//! ```

use std::{
    fs,
    path::Path,
    str::FromStr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use num_traits::ToPrimitive;
use rand::{
    SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    catalog::{Catalog, SalesOption},
    multipliers::{MultiplierEntry, MultiplierOutcomeSet},
    outcome::{LinePrice, ResolvedOutcome},
    selection::PricingRequest,
    service::{FullSetup, PricingService, ServiceError},
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading the fixture file
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// An amount could not be read as a decimal
    #[error("Invalid amount for {field}: {value}")]
    InvalidAmount {
        /// Field the amount belongs to
        field: &'static str,

        /// The rejected value
        value: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountFixture {
    Number(f64),
    Text(String),
}

impl AmountFixture {
    fn parse(&self, field: &'static str) -> Result<Decimal, FixtureError> {
        let parsed = match self {
            AmountFixture::Number(value) => Decimal::try_from(*value).ok(),
            AmountFixture::Text(value) => Decimal::from_str(value.trim()).ok(),
        };

        parsed.ok_or_else(|| FixtureError::InvalidAmount {
            field,
            value: match self {
                AmountFixture::Number(value) => value.to_string(),
                AmountFixture::Text(value) => value.clone(),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct MultiplierFixture {
    multiplier: AmountFixture,
    probability: AmountFixture,
}

#[derive(Debug, Deserialize)]
struct SalesOptionFixture {
    number: u32,
    name: String,
    cost: AmountFixture,
    selling_price: AmountFixture,
}

#[derive(Debug, Deserialize)]
struct PricingFixture {
    admin_password: String,
    #[serde(default)]
    multipliers: Vec<MultiplierFixture>,
    #[serde(default)]
    sales_options: Vec<SalesOptionFixture>,
}

#[derive(Debug)]
struct FixtureState {
    admin_password: String,
    multipliers: MultiplierOutcomeSet,
    catalog: Catalog,
}

/// Pricing service backed by fixture data, drawing multipliers locally.
#[derive(Debug)]
pub struct FixturePricingService {
    state: Mutex<FixtureState>,
    rng: Mutex<StdRng>,
}

impl FixturePricingService {
    /// Create a service from in-memory data.
    pub fn new(
        admin_password: impl Into<String>,
        multipliers: MultiplierOutcomeSet,
        catalog: Catalog,
    ) -> Self {
        Self {
            state: Mutex::new(FixtureState {
                admin_password: admin_password.into(),
                multipliers,
                catalog,
            }),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Load a service from a YAML fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an amount is
    /// not a decimal.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let service = Self::from_yaml(&contents)?;

        info!(path = %path.display(), "loaded pricing fixture");

        Ok(service)
    }

    /// Parse a service from YAML fixture text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or an amount is not a
    /// decimal.
    pub fn from_yaml(contents: &str) -> Result<Self, FixtureError> {
        let fixture: PricingFixture = serde_norway::from_str(contents)?;

        let multipliers = fixture
            .multipliers
            .iter()
            .map(|entry| {
                Ok(MultiplierEntry::new(
                    entry.multiplier.parse("multiplier")?,
                    entry.probability.parse("probability")?,
                ))
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        let options = fixture
            .sales_options
            .into_iter()
            .map(|option| {
                Ok(SalesOption {
                    cost: option.cost.parse("cost")?,
                    selling_price: option.selling_price.parse("selling_price")?,
                    number: option.number,
                    name: option.name,
                })
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        Ok(Self::new(
            fixture.admin_password,
            MultiplierOutcomeSet::new(multipliers),
            Catalog::new(options),
        ))
    }

    /// Use a seeded generator so draws are reproducible.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    fn state(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw(&self, multipliers: &MultiplierOutcomeSet) -> Result<Decimal, ServiceError> {
        let weights = multipliers
            .entries()
            .iter()
            .map(|entry| {
                entry.probability.to_f64().ok_or_else(|| {
                    ServiceError::InvalidPayload(format!(
                        "probability {} is not a usable weight",
                        entry.probability
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let distribution = WeightedIndex::new(&weights)
            .map_err(|error| ServiceError::Rejected(format!("cannot draw a multiplier: {error}")))?;

        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

            distribution.sample(&mut *rng)
        };

        multipliers
            .get(index)
            .map(|entry| entry.multiplier)
            .ok_or_else(|| ServiceError::Rejected("cannot draw a multiplier".to_string()))
    }
}

#[async_trait]
impl PricingService for FixturePricingService {
    async fn get_sales_options(&self) -> Result<Catalog, ServiceError> {
        Ok(self.state().catalog.clone())
    }

    async fn get_multipliers(&self) -> Result<MultiplierOutcomeSet, ServiceError> {
        Ok(self.state().multipliers.clone())
    }

    async fn generate_final_prices(
        &self,
        request: &PricingRequest,
    ) -> Result<ResolvedOutcome, ServiceError> {
        let (multipliers, catalog) = {
            let state = self.state();

            (state.multipliers.clone(), state.catalog.clone())
        };

        let multiplier = self.draw(&multipliers)?;

        let breakdown = request
            .items()
            .iter()
            .map(|line| {
                let subtotal = catalog.line_subtotal(line).ok_or_else(|| {
                    ServiceError::Rejected(format!("unknown sales option {}", line.option_number))
                })?;

                Ok(LinePrice {
                    option_number: line.option_number,
                    quantity: line.quantity,
                    final_price: subtotal * multiplier,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let total = breakdown.iter().map(|line| line.final_price).sum();

        debug!(%multiplier, %total, "fixture draw");

        Ok(ResolvedOutcome::new(multiplier, total).with_breakdown(breakdown))
    }

    async fn validate_admin_password(&self, password: &str) -> Result<bool, ServiceError> {
        Ok(self.state().admin_password == password)
    }

    async fn get_full_setup(&self) -> Result<FullSetup, ServiceError> {
        let state = self.state();

        Ok(FullSetup {
            multipliers: state.multipliers.clone(),
            catalog: state.catalog.clone(),
        })
    }

    async fn save_multipliers(
        &self,
        multipliers: &MultiplierOutcomeSet,
    ) -> Result<(), ServiceError> {
        self.state().multipliers = multipliers.clone();

        info!(entries = multipliers.len(), "fixture multipliers replaced");

        Ok(())
    }

    async fn save_sales_options(&self, catalog: &Catalog) -> Result<(), ServiceError> {
        self.state().catalog = catalog.clone();

        info!(options = catalog.len(), "fixture sales options replaced");

        Ok(())
    }
}
