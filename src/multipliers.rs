//! Multipliers

use rust_decimal::Decimal;
use thiserror::Error;

/// Total every multiplier table's probabilities are expected to add up to.
pub const PROBABILITY_TOTAL: Decimal = Decimal::ONE_HUNDRED;

/// Errors building a multiplier set from wire data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultiplierSetError {
    /// The multiplier and probability lists have different lengths.
    #[error("{multipliers} multipliers but {probabilities} probabilities")]
    LengthMismatch {
        /// Number of multipliers received
        multipliers: usize,
        /// Number of probabilities received
        probabilities: usize,
    },
}

/// One possible draw outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplierEntry {
    /// Factor applied to the item subtotal
    pub multiplier: Decimal,

    /// Chance of this entry being drawn, in percent
    pub probability: Decimal,
}

impl MultiplierEntry {
    /// Create a new entry.
    pub fn new(multiplier: Decimal, probability: Decimal) -> Self {
        Self {
            multiplier,
            probability,
        }
    }
}

/// Ordered multiplier table.
///
/// The order is the visual order of the reveal and must not change while a
/// flow is using the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiplierOutcomeSet {
    entries: Vec<MultiplierEntry>,
}

impl MultiplierOutcomeSet {
    /// Create a set from entries in display order.
    pub fn new(entries: impl Into<Vec<MultiplierEntry>>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Zip parallel multiplier and probability lists into a set.
    ///
    /// # Errors
    ///
    /// Returns [`MultiplierSetError::LengthMismatch`] if the lists differ in length.
    pub fn from_parallel(
        multipliers: Vec<Decimal>,
        probabilities: Vec<Decimal>,
    ) -> Result<Self, MultiplierSetError> {
        if multipliers.len() != probabilities.len() {
            return Err(MultiplierSetError::LengthMismatch {
                multipliers: multipliers.len(),
                probabilities: probabilities.len(),
            });
        }

        Ok(Self::new(
            multipliers
                .into_iter()
                .zip(probabilities)
                .map(|(multiplier, probability)| MultiplierEntry::new(multiplier, probability))
                .collect::<Vec<_>>(),
        ))
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[MultiplierEntry] {
        &self.entries
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&MultiplierEntry> {
        self.entries.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry whose multiplier equals `multiplier`.
    pub fn position_of(&self, multiplier: Decimal) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.multiplier == multiplier)
    }

    /// Sum of all probabilities.
    pub fn probability_total(&self) -> Decimal {
        self.entries.iter().map(|entry| entry.probability).sum()
    }

    /// Multipliers in display order.
    pub fn multipliers(&self) -> Vec<Decimal> {
        self.entries.iter().map(|entry| entry.multiplier).collect()
    }

    /// Probabilities in display order.
    pub fn probabilities(&self) -> Vec<Decimal> {
        self.entries.iter().map(|entry| entry.probability).collect()
    }
}
