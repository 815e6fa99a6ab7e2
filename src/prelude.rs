//! Fortune Pricing prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    admin::{AdminError, AdminSession, MultiplierRow, SalesOptionRow},
    catalog::{Catalog, SalesOption},
    fixture::{FixtureError, FixturePricingService},
    flow::{FlowError, FlowId, FlowPhase, FlowSettings, PricingFlow, SnapshotInvalidator},
    http::{HttpPricingService, HttpServiceConfig},
    multipliers::{MultiplierEntry, MultiplierOutcomeSet},
    outcome::{LinePrice, ResolvedOutcome},
    presenter::{Presentation, ResultPresenter},
    reveal::{Animator, OutcomeMismatch, RevealError, RevealState, RevealStep},
    selection::{PricingRequest, RawSelection, ValidationError, build_request},
    service::{FullSetup, PricingService, ServiceError},
    surface::RevealSurface,
};
