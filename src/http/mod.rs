//! HTTP pricing service.
//!
//! Talks to a single endpoint that dispatches on an `action` query parameter.
//! Reads are `GET`s; saves are form `POST`s carrying JSON-encoded arrays.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    catalog::Catalog,
    multipliers::MultiplierOutcomeSet,
    outcome::ResolvedOutcome,
    selection::PricingRequest,
    service::{FullSetup, PricingService, ServiceError},
};

mod records;

use records::{
    FinalPricesRecord, FullSetupRecord, MultipliersRecord, PasswordRecord, SalesOptionRecord,
    StatusRecord,
};

const STATUS_SUCCESS: &str = "success";

/// Configuration for connecting to a pricing endpoint.
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    /// Endpoint URL, e.g. `"http://localhost:8080/api.php"`.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

/// HTTP client for a remote pricing service.
#[derive(Debug, Clone)]
pub struct HttpPricingService {
    config: HttpServiceConfig,
    http: Client,
}

impl HttpPricingService {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HttpServiceConfig) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    fn get(&self, action: &str) -> RequestBuilder {
        self.http
            .get(&self.config.base_url)
            .query(&[("action", action)])
    }

    fn post(&self, action: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.http
            .post(&self.config.base_url)
            .query(&[("action", action)])
            .form(form)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        debug!(action, "pricing service request");

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ServiceError::UnexpectedResponse(format!(
                "{action} failed with status {status}: {text}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn save(&self, action: &str, form: &[(&str, &str)]) -> Result<(), ServiceError> {
        let status: StatusRecord = self.fetch(action, self.post(action, form)).await?;

        if status.status == STATUS_SUCCESS {
            return Ok(());
        }

        Err(ServiceError::Rejected(
            status.message.unwrap_or(status.status),
        ))
    }
}

#[async_trait]
impl PricingService for HttpPricingService {
    async fn get_sales_options(&self) -> Result<Catalog, ServiceError> {
        let action = "getSalesOptions";
        let records: Vec<SalesOptionRecord> = self.fetch(action, self.get(action)).await?;

        records::catalog_from_records(records)
    }

    async fn get_multipliers(&self) -> Result<MultiplierOutcomeSet, ServiceError> {
        let action = "getMultipliers";
        let record: MultipliersRecord = self.fetch(action, self.get(action)).await?;

        record.into_set()
    }

    async fn generate_final_prices(
        &self,
        request: &PricingRequest,
    ) -> Result<ResolvedOutcome, ServiceError> {
        let action = "generateFinalPrices";
        let selected = records::selected_options(request)?;

        let record: FinalPricesRecord = self
            .fetch(
                action,
                self.get(action).query(&[("selectedOptions", selected.as_str())]),
            )
            .await?;

        record.into_outcome()
    }

    async fn validate_admin_password(&self, password: &str) -> Result<bool, ServiceError> {
        let action = "validateAdminPassword";

        let record: PasswordRecord = self
            .fetch(action, self.get(action).query(&[("password", password)]))
            .await?;

        Ok(record.is_valid)
    }

    async fn get_full_setup(&self) -> Result<FullSetup, ServiceError> {
        let action = "getFullSetup";
        let record: FullSetupRecord = self.fetch(action, self.get(action)).await?;

        record.into_setup()
    }

    async fn save_multipliers(
        &self,
        multipliers: &MultiplierOutcomeSet,
    ) -> Result<(), ServiceError> {
        let (multipliers, probabilities) = records::multiplier_arrays(multipliers)?;

        self.save(
            "saveMultipliers",
            &[
                ("multipliers", multipliers.as_str()),
                ("probabilities", probabilities.as_str()),
            ],
        )
        .await
    }

    async fn save_sales_options(&self, catalog: &Catalog) -> Result<(), ServiceError> {
        let settings = records::sales_options_settings(catalog)?;

        self.save("saveSalesOptions", &[("settings", settings.as_str())])
            .await
    }
}
