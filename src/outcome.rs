//! Resolved Outcome

use rust_decimal::Decimal;

/// Final price of one line after the multiplier was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrice {
    /// Catalog option number
    pub option_number: u32,

    /// Quantity requested
    pub quantity: u32,

    /// Line total after the multiplier
    pub final_price: Decimal,
}

/// Result of one weighted draw, as computed by the pricing service.
///
/// The selected multiplier is the single source of truth for the flow: the
/// reveal lands on it and the presented total was computed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutcome {
    selected_multiplier: Decimal,
    total_final_price: Decimal,
    breakdown: Option<Vec<LinePrice>>,
}

impl ResolvedOutcome {
    /// Create an outcome without a per-line breakdown.
    pub fn new(selected_multiplier: Decimal, total_final_price: Decimal) -> Self {
        Self {
            selected_multiplier,
            total_final_price,
            breakdown: None,
        }
    }

    /// Attach a per-line breakdown.
    #[must_use]
    pub fn with_breakdown(mut self, breakdown: Vec<LinePrice>) -> Self {
        self.breakdown = Some(breakdown);
        self
    }

    /// The multiplier chosen by the draw.
    pub fn selected_multiplier(&self) -> Decimal {
        self.selected_multiplier
    }

    /// Total price after the multiplier, unrounded.
    pub fn total_final_price(&self) -> Decimal {
        self.total_final_price
    }

    /// Per-line prices, when the service supplied them.
    pub fn breakdown(&self) -> Option<&[LinePrice]> {
        self.breakdown.as_deref()
    }
}
