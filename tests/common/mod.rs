//! Shared helpers for integration tests.

#![expect(dead_code, reason = "not every test binary uses every helper")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use fortune_pricing::{
    catalog::{Catalog, SalesOption},
    multipliers::{MultiplierEntry, MultiplierOutcomeSet},
    outcome::ResolvedOutcome,
    presenter::Presentation,
    selection::PricingRequest,
    service::{FullSetup, PricingService, ServiceError},
    surface::RevealSurface,
};
use rust_decimal::Decimal;
use tokio::time;

/// Everything a [`RecordingSurface`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Trigger(bool),
    ShowReel(usize),
    Highlight(Option<usize>),
    HideReel,
    ShowResult {
        total: String,
        multiplier: String,
    },
    HideResult,
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Indices highlighted so far, skipping clears.
    pub fn highlights(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Highlight(index) => index,
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, event: SurfaceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl RevealSurface for RecordingSurface {
    fn set_trigger_enabled(&self, enabled: bool) {
        self.push(SurfaceEvent::Trigger(enabled));
    }

    fn show_reel(&self, multipliers: &MultiplierOutcomeSet) {
        self.push(SurfaceEvent::ShowReel(multipliers.len()));
    }

    fn highlight(&self, index: Option<usize>) {
        self.push(SurfaceEvent::Highlight(index));
    }

    fn hide_reel(&self) {
        self.push(SurfaceEvent::HideReel);
    }

    fn show_result(&self, presentation: &Presentation) {
        self.push(SurfaceEvent::ShowResult {
            total: presentation.total().to_string(),
            multiplier: presentation.multiplier().to_string(),
        });
    }

    fn hide_result(&self) {
        self.push(SurfaceEvent::HideResult);
    }

    fn show_error(&self, message: &str) {
        self.push(SurfaceEvent::Error(message.to_string()));
    }
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap_or_default()
}

/// `[x1.0 @ 50, x2.0 @ 30, x3.0 @ 20]`
pub fn three_multipliers() -> MultiplierOutcomeSet {
    MultiplierOutcomeSet::new([
        MultiplierEntry::new(dec("1.0"), dec("50")),
        MultiplierEntry::new(dec("2.0"), dec("30")),
        MultiplierEntry::new(dec("3.0"), dec("20")),
    ])
}

/// Widget at 10.00 and Gadget at 2.50.
pub fn catalog() -> Catalog {
    Catalog::new([
        SalesOption {
            number: 1,
            name: "Widget".to_string(),
            cost: dec("4.00"),
            selling_price: dec("10.00"),
        },
        SalesOption {
            number: 2,
            name: "Gadget".to_string(),
            cost: dec("1.00"),
            selling_price: dec("2.50"),
        },
    ])
}

/// Pricing service that answers after a delay on the tokio clock.
///
/// The draw fails with [`ServiceError::UnexpectedResponse`] when `draw` is
/// `None`. Only the multiplier and draw calls are answered.
#[derive(Debug, Clone, Default)]
pub struct DelayedService {
    pub multipliers_delay: Duration,
    pub draw_delay: Duration,
    pub draw: Option<ResolvedOutcome>,
}

#[async_trait]
impl PricingService for DelayedService {
    async fn get_sales_options(&self) -> Result<Catalog, ServiceError> {
        Ok(catalog())
    }

    async fn get_multipliers(&self) -> Result<MultiplierOutcomeSet, ServiceError> {
        time::sleep(self.multipliers_delay).await;

        Ok(three_multipliers())
    }

    async fn generate_final_prices(
        &self,
        _request: &PricingRequest,
    ) -> Result<ResolvedOutcome, ServiceError> {
        time::sleep(self.draw_delay).await;

        self.draw
            .clone()
            .ok_or_else(|| ServiceError::UnexpectedResponse("500".to_string()))
    }

    async fn validate_admin_password(&self, _password: &str) -> Result<bool, ServiceError> {
        Ok(false)
    }

    async fn get_full_setup(&self) -> Result<FullSetup, ServiceError> {
        Err(ServiceError::UnexpectedResponse("unsupported".to_string()))
    }

    async fn save_multipliers(
        &self,
        _multipliers: &MultiplierOutcomeSet,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::UnexpectedResponse("unsupported".to_string()))
    }

    async fn save_sales_options(&self, _catalog: &Catalog) -> Result<(), ServiceError> {
        Err(ServiceError::UnexpectedResponse("unsupported".to_string()))
    }
}
