//! Selections
//!
//! Turns the raw rows of the selection form into a validated
//! [`PricingRequest`]. Validation is purely local: nothing here talks to the
//! pricing service, so a rejected form never results in a draw.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use thiserror::Error;

use crate::catalog::Catalog;

/// Errors found while validating the selection form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No row was checked.
    #[error("Please select at least one sales option.")]
    EmptySelection,

    /// A checked row has a quantity that is not a whole number of at least 1.
    #[error("Please enter a valid quantity for option {0}.")]
    InvalidQuantity(u32),

    /// A checked row refers to an option the catalog does not have.
    #[error("Sales option {0} does not exist.")]
    UnknownOption(u32),

    /// The same option was checked more than once.
    #[error("Sales option {0} was selected more than once.")]
    DuplicateOption(u32),
}

/// One row of the selection form as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelection {
    /// Catalog option number the row belongs to
    pub option_number: u32,

    /// Whether the row's checkbox is ticked
    pub checked: bool,

    /// Quantity text as typed
    pub quantity: String,
}

impl RawSelection {
    /// A ticked row with the given quantity text.
    pub fn checked(option_number: u32, quantity: impl Into<String>) -> Self {
        Self {
            option_number,
            checked: true,
            quantity: quantity.into(),
        }
    }

    /// An unticked row.
    pub fn unchecked(option_number: u32) -> Self {
        Self {
            option_number,
            checked: false,
            quantity: "1".to_string(),
        }
    }
}

/// A validated line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemSelection {
    /// Catalog option number
    pub option_number: u32,

    /// Quantity, at least 1
    pub quantity: u32,
}

/// Validated, ordered line items for one draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingRequest {
    items: SmallVec<[LineItemSelection; 8]>,
}

impl PricingRequest {
    /// Line items in form order.
    pub fn items(&self) -> &[LineItemSelection] {
        &self.items
    }

    /// Number of line items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no line items. Never true for a built request.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Validates the checked rows of the selection form against the catalog.
///
/// Unchecked rows are ignored. Line items keep the order of the form.
///
/// # Errors
///
/// - [`ValidationError::EmptySelection`]: no row was checked.
/// - [`ValidationError::InvalidQuantity`]: a quantity is non-numeric or below 1.
/// - [`ValidationError::UnknownOption`]: the option is not in the catalog.
/// - [`ValidationError::DuplicateOption`]: the option was checked twice.
pub fn build_request(
    selections: &[RawSelection],
    catalog: &Catalog,
) -> Result<PricingRequest, ValidationError> {
    let mut items = SmallVec::new();
    let mut seen = FxHashSet::default();

    for selection in selections.iter().filter(|selection| selection.checked) {
        let option_number = selection.option_number;

        let quantity = parse_quantity(&selection.quantity)
            .ok_or(ValidationError::InvalidQuantity(option_number))?;

        if !catalog.contains(option_number) {
            return Err(ValidationError::UnknownOption(option_number));
        }

        if !seen.insert(option_number) {
            return Err(ValidationError::DuplicateOption(option_number));
        }

        items.push(LineItemSelection {
            option_number,
            quantity,
        });
    }

    if items.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    Ok(PricingRequest { items })
}

fn parse_quantity(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&quantity| quantity >= 1)
}
