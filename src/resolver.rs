//! Outcome Resolver

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    multipliers::{MultiplierOutcomeSet, PROBABILITY_TOTAL},
    outcome::ResolvedOutcome,
    selection::PricingRequest,
    service::{PricingService, ServiceError},
};

/// Which service call a fetch failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Fetching the multiplier table
    Multipliers,

    /// Requesting the draw and final prices
    FinalPrices,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Multipliers => f.write_str("multipliers"),
            FetchStage::FinalPrices => f.write_str("final prices"),
        }
    }
}

/// Errors resolving a draw.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A service call failed.
    #[error("failed to fetch {stage}")]
    FetchFailed {
        /// The call that failed
        stage: FetchStage,

        /// Underlying service error
        #[source]
        source: ServiceError,
    },

    /// The multiplier table is empty, so there is nothing to reveal.
    #[error("the multiplier table is empty")]
    NoMultipliers,
}

/// Fetches the multiplier snapshot, then requests the draw.
///
/// The snapshot is taken before the draw is requested and returned unchanged;
/// the reveal is computed against exactly this set.
///
/// # Errors
///
/// - [`ResolverError::FetchFailed`]: either service call failed.
/// - [`ResolverError::NoMultipliers`]: the fetched table has no entries. The
///   draw is not requested in this case.
pub async fn resolve(
    service: &dyn PricingService,
    request: &PricingRequest,
) -> Result<(MultiplierOutcomeSet, ResolvedOutcome), ResolverError> {
    let multipliers = service.get_multipliers().await.map_err(|source| {
        error!("failed to fetch multipliers: {source}");

        ResolverError::FetchFailed {
            stage: FetchStage::Multipliers,
            source,
        }
    })?;

    if multipliers.is_empty() {
        return Err(ResolverError::NoMultipliers);
    }

    let total = multipliers.probability_total();

    if total != PROBABILITY_TOTAL {
        warn!(%total, "multiplier probabilities do not sum to {PROBABILITY_TOTAL}");
    }

    debug!(entries = multipliers.len(), "captured multiplier snapshot");

    let outcome = service
        .generate_final_prices(request)
        .await
        .map_err(|source| {
            error!("failed to generate final prices: {source}");

            ResolverError::FetchFailed {
                stage: FetchStage::FinalPrices,
                source,
            }
        })?;

    debug!(
        selected_multiplier = %outcome.selected_multiplier(),
        total_final_price = %outcome.total_final_price(),
        "draw resolved"
    );

    Ok((multipliers, outcome))
}
