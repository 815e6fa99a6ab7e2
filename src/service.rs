//! Pricing service.
//!
//! The remote side of the system: catalog and multiplier storage, the
//! weighted draw, and the administrative saves.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::{
    catalog::Catalog, multipliers::MultiplierOutcomeSet, outcome::ResolvedOutcome,
    selection::PricingRequest,
};

/// Errors returned by a pricing service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An HTTP transport or decoding error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("unexpected response from pricing service: {0}")]
    UnexpectedResponse(String),

    /// The service answered, but the body did not make sense.
    #[error("invalid payload from pricing service: {0}")]
    InvalidPayload(String),

    /// The service refused the request.
    #[error("request rejected by pricing service: {0}")]
    Rejected(String),
}

/// Everything the administrator edits, loaded in one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullSetup {
    /// Multiplier table in display order
    pub multipliers: MultiplierOutcomeSet,

    /// Sales option catalog
    pub catalog: Catalog,
}

/// Black-box pricing backend.
#[automock]
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Retrieves the sales option catalog.
    async fn get_sales_options(&self) -> Result<Catalog, ServiceError>;

    /// Retrieves the multiplier table, in the same order on every call.
    async fn get_multipliers(&self) -> Result<MultiplierOutcomeSet, ServiceError>;

    /// Draws a multiplier and prices the request with it.
    async fn generate_final_prices(
        &self,
        request: &PricingRequest,
    ) -> Result<ResolvedOutcome, ServiceError>;

    /// Checks the administrator password.
    async fn validate_admin_password(&self, password: &str) -> Result<bool, ServiceError>;

    /// Retrieves the multiplier table and the catalog together.
    async fn get_full_setup(&self) -> Result<FullSetup, ServiceError>;

    /// Replaces the multiplier table.
    async fn save_multipliers(&self, multipliers: &MultiplierOutcomeSet)
    -> Result<(), ServiceError>;

    /// Replaces the sales option catalog.
    async fn save_sales_options(&self, catalog: &Catalog) -> Result<(), ServiceError>;
}
