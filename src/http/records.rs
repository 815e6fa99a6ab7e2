//! Wire records for the HTTP pricing service.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    catalog::{Catalog, SalesOption},
    multipliers::MultiplierOutcomeSet,
    outcome::{LinePrice, ResolvedOutcome},
    selection::PricingRequest,
    service::{FullSetup, ServiceError},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SalesOptionRecord {
    number: u32,
    name: String,
    cost: f64,
    selling_price: f64,
}

impl SalesOptionRecord {
    fn into_option(self) -> Result<SalesOption, ServiceError> {
        Ok(SalesOption {
            number: self.number,
            name: self.name,
            cost: decimal(self.cost, "cost")?,
            selling_price: decimal(self.selling_price, "sellingPrice")?,
        })
    }
}

pub(crate) fn catalog_from_records(records: Vec<SalesOptionRecord>) -> Result<Catalog, ServiceError> {
    records
        .into_iter()
        .map(SalesOptionRecord::into_option)
        .collect::<Result<Vec<_>, _>>()
        .map(Catalog::new)
}

#[derive(Debug, Deserialize)]
pub(crate) struct MultipliersRecord {
    multipliers: Vec<f64>,
    probabilities: Vec<f64>,
}

impl MultipliersRecord {
    pub(crate) fn into_set(self) -> Result<MultiplierOutcomeSet, ServiceError> {
        multiplier_set(&self.multipliers, &self.probabilities)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FullSetupRecord {
    multipliers: Vec<f64>,
    probabilities: Vec<f64>,
    sales_options: Vec<SalesOptionRecord>,
}

impl FullSetupRecord {
    pub(crate) fn into_setup(self) -> Result<FullSetup, ServiceError> {
        Ok(FullSetup {
            multipliers: multiplier_set(&self.multipliers, &self.probabilities)?,
            catalog: catalog_from_records(self.sales_options)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinePriceRecord {
    option_number: u32,
    quantity: u32,
    final_price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinalPricesRecord {
    selected_multiplier: f64,
    total_final_price: f64,
    #[serde(default)]
    final_prices: Option<serde_json::Value>,
}

impl FinalPricesRecord {
    pub(crate) fn into_outcome(self) -> Result<ResolvedOutcome, ServiceError> {
        let outcome = ResolvedOutcome::new(
            decimal(self.selected_multiplier, "selectedMultiplier")?,
            decimal(self.total_final_price, "totalFinalPrice")?,
        );

        let Some(value) = self.final_prices.filter(|value| !value.is_null()) else {
            return Ok(outcome);
        };

        match breakdown(value) {
            Ok(lines) => Ok(outcome.with_breakdown(lines)),
            Err(error) => {
                warn!("ignoring unreadable finalPrices: {error}");

                Ok(outcome)
            }
        }
    }
}

fn breakdown(value: serde_json::Value) -> Result<Vec<LinePrice>, ServiceError> {
    let lines: Vec<LinePriceRecord> = serde_json::from_value(value)
        .map_err(|error| ServiceError::InvalidPayload(error.to_string()))?;

    lines
        .into_iter()
        .map(|line| {
            Ok(LinePrice {
                option_number: line.option_number,
                quantity: line.quantity,
                final_price: decimal(line.final_price, "finalPrice")?,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordRecord {
    pub(crate) is_valid: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRecord {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectedOptionRecord {
    option_number: u32,
    quantity: u32,
}

/// JSON value of the `selectedOptions` parameter.
pub(crate) fn selected_options(request: &PricingRequest) -> Result<String, ServiceError> {
    let records = request
        .items()
        .iter()
        .map(|line| SelectedOptionRecord {
            option_number: line.option_number,
            quantity: line.quantity,
        })
        .collect::<Vec<_>>();

    encode(&records)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SalesOptionsSettings {
    numbers: Vec<u32>,
    names: Vec<String>,
    costs: Vec<f64>,
    selling_prices: Vec<f64>,
}

/// JSON value of the `settings` parameter of a catalog save.
pub(crate) fn sales_options_settings(catalog: &Catalog) -> Result<String, ServiceError> {
    let settings = SalesOptionsSettings {
        numbers: catalog.iter().map(|option| option.number).collect(),
        names: catalog.iter().map(|option| option.name.clone()).collect(),
        costs: catalog
            .iter()
            .map(|option| float(option.cost))
            .collect::<Result<_, _>>()?,
        selling_prices: catalog
            .iter()
            .map(|option| float(option.selling_price))
            .collect::<Result<_, _>>()?,
    };

    encode(&settings)
}

/// JSON values of the `multipliers` and `probabilities` parameters.
pub(crate) fn multiplier_arrays(set: &MultiplierOutcomeSet) -> Result<(String, String), ServiceError> {
    let multipliers = set
        .entries()
        .iter()
        .map(|entry| float(entry.multiplier))
        .collect::<Result<Vec<_>, _>>()?;

    let probabilities = set
        .entries()
        .iter()
        .map(|entry| float(entry.probability))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((encode(&multipliers)?, encode(&probabilities)?))
}

fn multiplier_set(multipliers: &[f64], probabilities: &[f64]) -> Result<MultiplierOutcomeSet, ServiceError> {
    let multipliers = multipliers
        .iter()
        .map(|&value| decimal(value, "multipliers"))
        .collect::<Result<Vec<_>, _>>()?;

    let probabilities = probabilities
        .iter()
        .map(|&value| decimal(value, "probabilities"))
        .collect::<Result<Vec<_>, _>>()?;

    MultiplierOutcomeSet::from_parallel(multipliers, probabilities)
        .map_err(|error| ServiceError::InvalidPayload(error.to_string()))
}

fn decimal(value: f64, field: &str) -> Result<Decimal, ServiceError> {
    Decimal::try_from(value)
        .map_err(|error| ServiceError::InvalidPayload(format!("{field}: {value} ({error})")))
}

fn float(value: Decimal) -> Result<f64, ServiceError> {
    value
        .to_f64()
        .ok_or_else(|| ServiceError::InvalidPayload(format!("{value} cannot be sent as a number")))
}

fn encode(value: &impl Serialize) -> Result<String, ServiceError> {
    serde_json::to_string(value).map_err(|error| ServiceError::InvalidPayload(error.to_string()))
}
