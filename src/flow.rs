//! Pricing Flow
//!
//! A [`PricingFlow`] owns everything one "generate price" action needs: the
//! catalog used for validation, the multiplier snapshot of the current flow,
//! and the single task that resolves the draw and drives the reveal.
//!
//! Each started flow gets a new generation number. Aborting, invalidating the
//! snapshot or finishing bumps or clears it, and the running task checks its
//! generation under the state lock before touching the surface, so a late
//! network answer or a leftover timer can never render into a newer flow.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use rusty_money::iso::{self, Currency};
use thiserror::Error;
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    catalog::Catalog,
    multipliers::MultiplierOutcomeSet,
    outcome::ResolvedOutcome,
    presenter::ResultPresenter,
    resolver::{self, ResolverError},
    reveal::{Animator, DEFAULT_FULL_CYCLES, OutcomeMismatch, RevealError, RevealStep, SettleTarget},
    selection::{PricingRequest, RawSelection, ValidationError, build_request},
    service::{PricingService, ServiceError},
    surface::RevealSurface,
};

/// Default interval between reveal ticks.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Default pause on the winning entry before the result is shown.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

const MIN_TICK: Duration = Duration::from_millis(1);

/// Callback invoked with the outcome of a completed flow.
pub type CompleteCallback = Arc<dyn Fn(&ResolvedOutcome) + Send + Sync>;

/// Callback invoked when a started flow fails.
pub type ErrorCallback = Arc<dyn Fn(&FlowError) + Send + Sync>;

/// Errors of a pricing flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The selection form did not validate. Nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another flow is still resolving or revealing.
    #[error("a pricing flow is already in progress")]
    Busy,

    /// The catalog could not be loaded.
    #[error("failed to load sales options")]
    CatalogUnavailable(#[source] ServiceError),

    /// The draw could not be resolved.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// The reveal could not be driven.
    #[error(transparent)]
    Reveal(#[from] RevealError),

    /// An administrator saved a new table while the flow was running.
    #[error("the multiplier table changed while the flow was in progress")]
    SnapshotInvalidated,
}

impl FlowError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(error) => error.to_string(),
            FlowError::Busy => "A price is already being generated.".to_string(),
            FlowError::CatalogUnavailable(_) => {
                "Failed to load sales options. Please try again later.".to_string()
            }
            FlowError::Resolver(_) | FlowError::Reveal(_) => {
                "An error occurred while generating the price. Please try again.".to_string()
            }
            FlowError::SnapshotInvalidated => {
                "The multiplier table was updated. Please generate the price again.".to_string()
            }
        }
    }
}

/// Timing and display settings for a flow.
#[derive(Debug, Clone, Copy)]
pub struct FlowSettings {
    /// Interval between reveal ticks
    pub tick: Duration,

    /// Full passes over the reel before settling
    pub full_cycles: u32,

    /// Pause on the winning entry before the result is shown
    pub settle_delay: Duration,

    /// Currency used to present totals
    pub currency: &'static Currency,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            full_cycles: DEFAULT_FULL_CYCLES,
            settle_delay: DEFAULT_SETTLE_DELAY,
            currency: iso::USD,
        }
    }
}

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// Nothing in progress; a new flow may start.
    Idle,

    /// Waiting on the multiplier snapshot or the draw.
    Resolving,

    /// The reel is cycling.
    Cycling,

    /// The reel has stopped on the winning entry.
    Settling,
}

/// Identifies one started flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowId(u64);

impl FlowId {
    /// Generation number of the flow.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

struct FlowState {
    generation: u64,
    phase: FlowPhase,
    task: Option<JoinHandle<()>>,
    catalog: Catalog,
    snapshot: Option<Arc<MultiplierOutcomeSet>>,
    warnings: Vec<OutcomeMismatch>,
}

struct Shared {
    service: Arc<dyn PricingService>,
    surface: Arc<dyn RevealSurface>,
    settings: FlowSettings,
    presenter: ResultPresenter,
    state: Mutex<FlowState>,
    on_complete: Mutex<Vec<CompleteCallback>>,
    on_error: Mutex<Vec<ErrorCallback>>,
}

enum TickControl {
    Continue,
    Settled,
    Stale,
}

/// Selection-to-reveal pricing flow.
///
/// Must be used from within a tokio runtime: [`PricingFlow::start_flow`]
/// spawns the task that resolves and reveals the draw.
pub struct PricingFlow {
    shared: Arc<Shared>,
}

impl PricingFlow {
    /// Create an idle flow with an empty catalog.
    pub fn new(
        service: Arc<dyn PricingService>,
        surface: Arc<dyn RevealSurface>,
        mut settings: FlowSettings,
    ) -> Self {
        settings.tick = settings.tick.max(MIN_TICK);

        Self {
            shared: Arc::new(Shared {
                service,
                surface,
                presenter: ResultPresenter::new(settings.currency),
                settings,
                state: Mutex::new(FlowState {
                    generation: 0,
                    phase: FlowPhase::Idle,
                    task: None,
                    catalog: Catalog::default(),
                    snapshot: None,
                    warnings: Vec::new(),
                }),
                on_complete: Mutex::new(Vec::new()),
                on_error: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Fetch the catalog and use it to validate later selections.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::CatalogUnavailable`] if the service call fails.
    pub async fn load_catalog(&self) -> Result<Catalog, FlowError> {
        let catalog = self
            .shared
            .service
            .get_sales_options()
            .await
            .map_err(|source| {
                error!("failed to fetch sales options: {source}");

                FlowError::CatalogUnavailable(source)
            })?;

        if catalog.is_empty() {
            warn!("catalog is empty; no sales options can be selected");
        }

        self.set_catalog(catalog.clone());

        Ok(catalog)
    }

    /// Replace the catalog used to validate selections.
    pub fn set_catalog(&self, catalog: Catalog) {
        debug!(options = catalog.len(), "catalog replaced");

        self.shared.state().catalog = catalog;
    }

    /// The catalog used to validate selections.
    pub fn catalog(&self) -> Catalog {
        self.shared.state().catalog.clone()
    }

    /// Validate `selections` and start a new flow.
    ///
    /// Validation happens before anything else; a rejected form never reaches
    /// the service or the surface.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Busy`]: a flow is already in progress.
    /// - [`FlowError::Validation`]: the form did not validate.
    pub fn start_flow(&self, selections: &[RawSelection]) -> Result<FlowId, FlowError> {
        let mut state = self.shared.state();

        if state.phase != FlowPhase::Idle {
            return Err(FlowError::Busy);
        }

        let request = build_request(selections, &state.catalog)?;

        state.generation += 1;
        state.phase = FlowPhase::Resolving;
        state.snapshot = None;

        let generation = state.generation;

        self.shared.surface.set_trigger_enabled(false);
        self.shared.surface.hide_result();

        info!(flow = generation, lines = request.len(), "pricing flow started");

        let shared = Arc::clone(&self.shared);

        state.task = Some(tokio::spawn(async move {
            if let Err(error) = drive(&shared, generation, &request).await {
                shared.fail(generation, &error);
            }
        }));

        Ok(FlowId(generation))
    }

    /// Abort the flow in progress, if any.
    ///
    /// Stops its task, discards any late results, clears the reel and
    /// re-enables the trigger. No callback fires for an aborted flow. Returns
    /// whether a flow was aborted.
    pub fn abort_flow(&self) -> bool {
        let mut state = self.shared.state();

        if state.phase == FlowPhase::Idle {
            return false;
        }

        info!(flow = state.generation, "pricing flow aborted");

        self.shared.cancel_locked(&mut state);

        true
    }

    /// Close the result view of a finished flow.
    ///
    /// Does nothing while a flow is running. Returns whether the view was
    /// closed.
    pub fn dismiss_result(&self) -> bool {
        let state = self.shared.state();

        if state.phase != FlowPhase::Idle {
            return false;
        }

        drop(state);

        self.shared.surface.hide_result();

        true
    }

    /// Register a callback for completed flows.
    pub fn on_flow_complete(&self, callback: impl Fn(&ResolvedOutcome) + Send + Sync + 'static) {
        lock(&self.shared.on_complete).push(Arc::new(callback));
    }

    /// Register a callback for flows that failed after starting.
    pub fn on_flow_error(&self, callback: impl Fn(&FlowError) + Send + Sync + 'static) {
        lock(&self.shared.on_error).push(Arc::new(callback));
    }

    /// Current phase.
    pub fn phase(&self) -> FlowPhase {
        self.shared.state().phase
    }

    /// Multiplier snapshot of the flow in progress.
    pub fn snapshot(&self) -> Option<Arc<MultiplierOutcomeSet>> {
        self.shared.state().snapshot.clone()
    }

    /// Data-integrity warnings recorded by past flows.
    pub fn integrity_warnings(&self) -> Vec<OutcomeMismatch> {
        self.shared.state().warnings.clone()
    }

    /// Handle for invalidating the snapshot after an administrative save.
    pub fn invalidation_handle(&self) -> SnapshotInvalidator {
        SnapshotInvalidator {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &FlowSettings {
        &self.shared.settings
    }
}

impl fmt::Debug for PricingFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PricingFlow")
            .field("settings", &self.shared.settings)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Drop for PricingFlow {
    fn drop(&mut self) {
        let mut state = self.shared.state();

        state.generation += 1;

        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}

/// Invalidates a flow's multiplier snapshot once the table has been saved.
#[derive(Clone)]
pub struct SnapshotInvalidator {
    shared: Weak<Shared>,
}

impl SnapshotInvalidator {
    /// Drop the held snapshot. A flow in progress is aborted and reported to
    /// the error callbacks as [`FlowError::SnapshotInvalidated`].
    ///
    /// Returns whether a flow was aborted.
    pub fn invalidate(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };

        let aborted = {
            let mut state = shared.state();

            state.snapshot = None;

            if state.phase == FlowPhase::Idle {
                false
            } else {
                shared.cancel_locked(&mut state);
                shared
                    .surface
                    .show_error(&FlowError::SnapshotInvalidated.user_message());

                true
            }
        };

        if aborted {
            warn!("multiplier table changed; aborted the pricing flow in progress");

            shared.notify_error(&FlowError::SnapshotInvalidated);
        }

        aborted
    }

    /// Replace the catalog the flow validates selections against.
    pub fn replace_catalog(&self, catalog: Catalog) {
        if let Some(shared) = self.shared.upgrade() {
            debug!(options = catalog.len(), "catalog replaced after save");

            shared.state().catalog = catalog;
        }
    }
}

impl fmt::Debug for SnapshotInvalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotInvalidator")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, FlowState> {
        lock(&self.state)
    }

    fn begin_reveal(
        &self,
        generation: u64,
        multipliers: &Arc<MultiplierOutcomeSet>,
        target: SettleTarget,
        animator: &mut Animator,
    ) -> Result<bool, RevealError> {
        let mut state = self.state();

        if state.generation != generation {
            return Ok(false);
        }

        animator.start()?;

        if let Some(mismatch) = target.mismatch() {
            warn!(flow = generation, "data integrity: {mismatch}");

            state.warnings.push(mismatch);
        }

        state.snapshot = Some(Arc::clone(multipliers));
        state.phase = FlowPhase::Cycling;

        self.surface.show_reel(multipliers);

        Ok(true)
    }

    fn advance(&self, generation: u64, animator: &mut Animator) -> Result<TickControl, RevealError> {
        let mut state = self.state();

        if state.generation != generation {
            return Ok(TickControl::Stale);
        }

        match animator.tick()? {
            RevealStep::Advanced { highlighted } => {
                self.surface.highlight(Some(highlighted));

                Ok(TickControl::Continue)
            }
            RevealStep::Settled { index } => {
                self.surface.highlight(Some(index));
                state.phase = FlowPhase::Settling;

                debug!(flow = generation, index, "reveal settling");

                Ok(TickControl::Settled)
            }
        }
    }

    fn complete(
        &self,
        generation: u64,
        animator: &mut Animator,
        outcome: &ResolvedOutcome,
    ) -> Result<bool, RevealError> {
        let mut state = self.state();

        if state.generation != generation {
            return Ok(false);
        }

        let index = animator.finish()?;
        let presentation = self.presenter.present(outcome);

        state.phase = FlowPhase::Idle;
        state.task = None;

        self.surface.hide_reel();
        self.surface.show_result(&presentation);
        self.surface.set_trigger_enabled(true);

        animator.reset();

        info!(
            flow = generation,
            index,
            total = presentation.total(),
            "pricing flow complete"
        );

        Ok(true)
    }

    fn fail(&self, generation: u64, error: &FlowError) {
        {
            let mut state = self.state();

            if state.generation != generation {
                debug!(flow = generation, "discarding late error: {error}");

                return;
            }

            state.phase = FlowPhase::Idle;
            state.task = None;
            state.snapshot = None;

            self.reset_surface();
            self.surface.show_error(&error.user_message());
        }

        error!(flow = generation, "pricing flow failed: {error}");

        self.notify_error(error);
    }

    fn cancel_locked(&self, state: &mut FlowState) {
        state.generation += 1;

        if let Some(task) = state.task.take() {
            task.abort();
        }

        state.phase = FlowPhase::Idle;
        state.snapshot = None;

        self.reset_surface();
    }

    fn reset_surface(&self) {
        self.surface.highlight(None);
        self.surface.hide_reel();
        self.surface.set_trigger_enabled(true);
    }

    fn notify_complete(&self, outcome: &ResolvedOutcome) {
        let callbacks = lock(&self.on_complete).clone();

        for callback in callbacks {
            callback(outcome);
        }
    }

    fn notify_error(&self, error: &FlowError) {
        let callbacks = lock(&self.on_error).clone();

        for callback in callbacks {
            callback(error);
        }
    }
}

async fn drive(shared: &Shared, generation: u64, request: &PricingRequest) -> Result<(), FlowError> {
    let (multipliers, outcome) = resolver::resolve(shared.service.as_ref(), request).await?;

    let multipliers = Arc::new(multipliers);
    let target = SettleTarget::locate(&multipliers, outcome.selected_multiplier());
    let mut animator = Animator::new(
        multipliers.len(),
        target.index(),
        shared.settings.full_cycles,
    )?;

    if !shared.begin_reveal(generation, &multipliers, target, &mut animator)? {
        debug!(flow = generation, "discarding late draw");

        return Ok(());
    }

    let tick = shared.settings.tick;
    let mut ticker = time::interval_at(Instant::now() + tick, tick);

    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match shared.advance(generation, &mut animator)? {
            TickControl::Continue => {}
            TickControl::Settled => break,
            TickControl::Stale => return Ok(()),
        }
    }

    time::sleep(shared.settings.settle_delay).await;

    if shared.complete(generation, &mut animator, &outcome)? {
        shared.notify_complete(&outcome);
    }

    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
