//! Administration
//!
//! Password-gated editing of the multiplier table and the catalog. Rows are
//! validated locally before anything is sent; a successful save invalidates
//! the snapshot held by a running pricing flow, and a saved catalog replaces
//! the one the flow validates against.

use std::{fmt, str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    catalog::{Catalog, SalesOption},
    flow::SnapshotInvalidator,
    multipliers::{MultiplierEntry, MultiplierOutcomeSet, PROBABILITY_TOTAL},
    service::{FullSetup, PricingService, ServiceError},
};

/// Errors in an edited multiplier table. Rows are numbered from 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MultiplierTableError {
    /// The multiplier is not a number greater than 0.
    #[error("Invalid multiplier in row {row}. Please enter a number greater than 0.")]
    InvalidMultiplier {
        /// Offending row
        row: usize,
    },

    /// The probability is not a non-negative number.
    #[error("Invalid probability in row {row}. Please enter a non-negative number.")]
    InvalidProbability {
        /// Offending row
        row: usize,
    },

    /// The probabilities do not add up to 100.
    #[error("Total probability must sum to 100%. Currently, it sums to {total}%.")]
    ProbabilityTotal {
        /// Actual sum
        total: Decimal,
    },
}

/// Errors in an edited catalog. Rows are numbered from 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SalesOptionTableError {
    /// The option number is not a positive integer.
    #[error("Invalid number in Sales Option row {row}. Please enter a positive integer.")]
    InvalidNumber {
        /// Offending row
        row: usize,
    },

    /// The name is blank.
    #[error("Invalid name in Sales Option row {row}. Please enter a non-empty name.")]
    EmptyName {
        /// Offending row
        row: usize,
    },

    /// The cost is not a non-negative number.
    #[error("Invalid cost in Sales Option row {row}. Please enter a non-negative number.")]
    InvalidCost {
        /// Offending row
        row: usize,
    },

    /// The selling price is not a non-negative number.
    #[error("Invalid selling price in Sales Option row {row}. Please enter a non-negative number.")]
    InvalidSellingPrice {
        /// Offending row
        row: usize,
    },

    /// The option number is already used by an earlier row.
    #[error("Duplicate number {number} in Sales Option row {row}.")]
    DuplicateNumber {
        /// Offending row
        row: usize,

        /// Repeated option number
        number: u32,
    },
}

/// Errors of an administrative session.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No password was entered.
    #[error("Please enter the admin password.")]
    MissingPassword,

    /// The service rejected the password.
    #[error("Invalid password. Please try again.")]
    InvalidPassword,

    /// A service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The multiplier table did not validate.
    #[error(transparent)]
    Multipliers(#[from] MultiplierTableError),

    /// The catalog did not validate.
    #[error(transparent)]
    SalesOptions(#[from] SalesOptionTableError),
}

/// One edited row of the multiplier table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiplierRow {
    /// Multiplier text as typed
    pub multiplier: String,

    /// Probability text as typed, in percent
    pub probability: String,
}

impl MultiplierRow {
    /// Create a row from its two cells.
    pub fn new(multiplier: impl Into<String>, probability: impl Into<String>) -> Self {
        Self {
            multiplier: multiplier.into(),
            probability: probability.into(),
        }
    }
}

/// One edited row of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesOptionRow {
    /// Option number text as typed
    pub number: String,

    /// Product name
    pub name: String,

    /// Cost text as typed
    pub cost: String,

    /// Selling price text as typed
    pub selling_price: String,
}

/// Validate an edited multiplier table.
///
/// Multipliers must be greater than 0, probabilities at least 0, and the
/// probabilities must sum to exactly 100.
///
/// # Errors
///
/// Returns the first problem found, naming its row.
pub fn validate_multiplier_rows(
    rows: &[MultiplierRow],
) -> Result<MultiplierOutcomeSet, MultiplierTableError> {
    let mut entries = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 1;

        let multiplier = parse_amount(&row.multiplier)
            .filter(|multiplier| *multiplier > Decimal::ZERO)
            .ok_or(MultiplierTableError::InvalidMultiplier { row: row_number })?;

        let probability = parse_amount(&row.probability)
            .filter(|probability| *probability >= Decimal::ZERO)
            .ok_or(MultiplierTableError::InvalidProbability { row: row_number })?;

        entries.push(MultiplierEntry::new(multiplier, probability));
    }

    let set = MultiplierOutcomeSet::new(entries);
    let total = set.probability_total();

    if total != PROBABILITY_TOTAL {
        return Err(MultiplierTableError::ProbabilityTotal {
            total: total.normalize(),
        });
    }

    Ok(set)
}

/// Validate an edited catalog.
///
/// # Errors
///
/// Returns the first problem found, naming its row.
pub fn validate_sales_option_rows(rows: &[SalesOptionRow]) -> Result<Catalog, SalesOptionTableError> {
    let mut options = Vec::with_capacity(rows.len());
    let mut seen = FxHashSet::default();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 1;

        let number = row
            .number
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|number| *number > 0)
            .ok_or(SalesOptionTableError::InvalidNumber { row: row_number })?;

        let name = row.name.trim();

        if name.is_empty() {
            return Err(SalesOptionTableError::EmptyName { row: row_number });
        }

        let cost = parse_amount(&row.cost)
            .filter(|cost| *cost >= Decimal::ZERO)
            .ok_or(SalesOptionTableError::InvalidCost { row: row_number })?;

        let selling_price = parse_amount(&row.selling_price)
            .filter(|price| *price >= Decimal::ZERO)
            .ok_or(SalesOptionTableError::InvalidSellingPrice { row: row_number })?;

        if !seen.insert(number) {
            return Err(SalesOptionTableError::DuplicateNumber {
                row: row_number,
                number,
            });
        }

        options.push(SalesOption {
            number,
            name: name.to_string(),
            cost,
            selling_price,
        });
    }

    Ok(Catalog::new(options))
}

fn parse_amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(text.trim()).ok()
}

/// An authenticated administrative session.
pub struct AdminSession {
    service: Arc<dyn PricingService>,
    invalidator: Option<SnapshotInvalidator>,
}

impl AdminSession {
    /// Check `password` with the service and open a session.
    ///
    /// # Errors
    ///
    /// - [`AdminError::MissingPassword`]: `password` is empty. The service is
    ///   not contacted.
    /// - [`AdminError::InvalidPassword`]: the service rejected the password.
    /// - [`AdminError::Service`]: the check itself failed.
    pub async fn login(service: Arc<dyn PricingService>, password: &str) -> Result<Self, AdminError> {
        if password.is_empty() {
            return Err(AdminError::MissingPassword);
        }

        if !service.validate_admin_password(password).await? {
            warn!("admin login rejected");

            return Err(AdminError::InvalidPassword);
        }

        info!("admin login accepted");

        Ok(Self {
            service,
            invalidator: None,
        })
    }

    /// Invalidate `invalidator`'s flow snapshot after every successful save,
    /// and hand it every saved catalog.
    #[must_use]
    pub fn with_invalidator(mut self, invalidator: SnapshotInvalidator) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Load the multiplier table and the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    pub async fn full_setup(&self) -> Result<FullSetup, AdminError> {
        Ok(self.service.get_full_setup().await?)
    }

    /// Validate and save an edited multiplier table.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is sent, or the service
    /// error if the save fails.
    pub async fn save_multipliers(
        &self,
        rows: &[MultiplierRow],
    ) -> Result<MultiplierOutcomeSet, AdminError> {
        let set = validate_multiplier_rows(rows)?;

        self.service.save_multipliers(&set).await?;

        info!(entries = set.len(), "multipliers saved");

        self.invalidate();

        Ok(set)
    }

    /// Validate and save an edited catalog.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is sent, or the service
    /// error if the save fails.
    pub async fn save_sales_options(&self, rows: &[SalesOptionRow]) -> Result<Catalog, AdminError> {
        let catalog = validate_sales_option_rows(rows)?;

        self.service.save_sales_options(&catalog).await?;

        info!(options = catalog.len(), "sales options saved");

        if let Some(invalidator) = &self.invalidator {
            invalidator.replace_catalog(catalog.clone());
        }

        self.invalidate();

        Ok(catalog)
    }

    fn invalidate(&self) {
        if let Some(invalidator) = &self.invalidator {
            invalidator.invalidate();
        }
    }
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("invalidator", &self.invalidator)
            .finish_non_exhaustive()
    }
}
