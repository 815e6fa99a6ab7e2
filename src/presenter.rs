//! Result Presenter

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, iso::Currency};

use crate::outcome::ResolvedOutcome;

/// One line of the presented breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedLine {
    /// Catalog option number
    pub option_number: u32,

    /// Quantity requested
    pub quantity: u32,

    /// Line total, rounded for display
    pub final_price: String,
}

/// Display-ready totals for a finished flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    total: String,
    formatted_total: String,
    multiplier: String,
    lines: Vec<PresentedLine>,
}

impl Presentation {
    /// Total rounded to the currency's minor units, e.g. `40.00`.
    pub fn total(&self) -> &str {
        &self.total
    }

    /// Total with currency formatting, e.g. `$40.00`.
    pub fn formatted_total(&self) -> &str {
        &self.formatted_total
    }

    /// Winning multiplier label, e.g. `x2.0`.
    pub fn multiplier(&self) -> &str {
        &self.multiplier
    }

    /// Per-line breakdown, empty when the service sent none.
    pub fn lines(&self) -> &[PresentedLine] {
        &self.lines
    }
}

/// Formats resolved outcomes for display. Rounding happens here and only here.
#[derive(Debug, Clone, Copy)]
pub struct ResultPresenter {
    currency: &'static Currency,
}

impl ResultPresenter {
    /// Create a presenter for `currency`.
    pub fn new(currency: &'static Currency) -> Self {
        Self { currency }
    }

    /// Currency used for display.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Render the totals of `outcome`.
    pub fn present(&self, outcome: &ResolvedOutcome) -> Presentation {
        let total = self.round(outcome.total_final_price());

        let lines = outcome
            .breakdown()
            .unwrap_or_default()
            .iter()
            .map(|line| PresentedLine {
                option_number: line.option_number,
                quantity: line.quantity,
                final_price: self.format(self.round(line.final_price)),
            })
            .collect();

        Presentation {
            total: self.format(total),
            formatted_total: Money::from_decimal(total, self.currency).to_string(),
            multiplier: multiplier_label(outcome.selected_multiplier()),
            lines,
        }
    }

    fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.currency.exponent, RoundingStrategy::MidpointAwayFromZero)
    }

    fn format(&self, amount: Decimal) -> String {
        format!("{amount:.prec$}", prec = self.currency.exponent as usize)
    }
}

/// Label for a multiplier on the reel, e.g. `x1.5`.
pub fn multiplier_label(multiplier: Decimal) -> String {
    let normalized = multiplier.normalize();

    if normalized.scale() == 0 {
        format!("x{normalized}.0")
    } else {
        format!("x{normalized}")
    }
}
