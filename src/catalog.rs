//! Catalog

use std::io;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

use crate::selection::LineItemSelection;

/// A purchasable catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesOption {
    /// Option number shown to the user and used in requests
    pub number: u32,

    /// Product name
    pub name: String,

    /// Cost to the seller
    pub cost: Decimal,

    /// Unit price charged before the multiplier is applied
    pub selling_price: Decimal,
}

/// Ordered set of sales options with lookup by option number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    options: Vec<SalesOption>,
    by_number: FxHashMap<u32, usize>,
}

impl Catalog {
    /// Create a catalog from options in display order.
    ///
    /// When an option number repeats, lookups resolve to its first occurrence.
    pub fn new(options: impl Into<Vec<SalesOption>>) -> Self {
        let options = options.into();
        let mut by_number = FxHashMap::default();

        for (idx, option) in options.iter().enumerate() {
            by_number.entry(option.number).or_insert(idx);
        }

        Self { options, by_number }
    }

    /// Look up an option by number.
    pub fn get(&self, number: u32) -> Option<&SalesOption> {
        self.by_number
            .get(&number)
            .and_then(|&idx| self.options.get(idx))
    }

    /// Whether the catalog has an option with the given number.
    pub fn contains(&self, number: u32) -> bool {
        self.by_number.contains_key(&number)
    }

    /// Options in display order.
    pub fn options(&self) -> &[SalesOption] {
        &self.options
    }

    /// Iterate over options in display order.
    pub fn iter(&self) -> impl Iterator<Item = &SalesOption> {
        self.options.iter()
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether the catalog has no options.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Selling price multiplied by quantity for one line, if the option exists.
    pub fn line_subtotal(&self, line: &LineItemSelection) -> Option<Decimal> {
        self.get(line.option_number)
            .map(|option| option.selling_price * Decimal::from(line.quantity))
    }

    /// Writes the catalog as a table with prices formatted in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write, currency: &'static Currency) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(
                out,
                "No sales options available. Please contact the administrator."
            );
        }

        let mut builder = Builder::default();

        builder.push_record(["#", "Name", "Price"]);

        for option in &self.options {
            builder.push_record([
                option.number.to_string(),
                option.name.clone(),
                Money::from_decimal(option.selling_price, currency).to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..3), Alignment::right());

        writeln!(out, "{table}")
    }
}

impl From<Vec<SalesOption>> for Catalog {
    fn from(options: Vec<SalesOption>) -> Self {
        Self::new(options)
    }
}
