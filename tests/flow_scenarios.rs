//! Timeline tests for the pricing flow.
//!
//! These run on a paused tokio clock, so every tick and the settle delay are
//! observed at exact virtual times.

use std::{sync::Arc, time::Duration};

use fortune_pricing::{
    flow::{FlowError, FlowPhase, FlowSettings, PricingFlow},
    multipliers::MultiplierOutcomeSet,
    outcome::ResolvedOutcome,
    resolver::ResolverError,
    selection::{RawSelection, ValidationError},
    service::{MockPricingService, PricingService, ServiceError},
};
use testresult::TestResult;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};

mod common;

use common::{DelayedService, RecordingSurface, SurfaceEvent, catalog, dec, three_multipliers};

type FlowEnd = Result<ResolvedOutcome, String>;

fn flow_with(
    service: impl PricingService + 'static,
    surface: &Arc<RecordingSurface>,
) -> PricingFlow {
    let flow = PricingFlow::new(Arc::new(service), surface.clone(), FlowSettings::default());

    flow.set_catalog(catalog());

    flow
}

fn watch(flow: &PricingFlow) -> mpsc::UnboundedReceiver<FlowEnd> {
    let (tx, rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();

    flow.on_flow_complete(move |outcome| {
        let _sent = tx.send(Ok(outcome.clone()));
    });

    flow.on_flow_error(move |error| {
        let _sent = error_tx.send(Err(error.to_string()));
    });

    rx
}

fn drawing(multiplier: &str, total: &str) -> MockPricingService {
    let mut service = MockPricingService::new();
    let outcome = ResolvedOutcome::new(dec(multiplier), dec(total));

    service
        .expect_get_multipliers()
        .returning(|| Ok(three_multipliers()));

    service
        .expect_generate_final_prices()
        .returning(move |_| Ok(outcome.clone()));

    service
}

/// Highlights of a full reveal over three entries with five cycles.
fn full_reveal(target: usize) -> Vec<usize> {
    let mut highlights = [0, 1, 2].repeat(4);

    highlights.extend([0, 1, target]);

    highlights
}

#[tokio::test(start_paused = true)]
async fn settles_on_the_drawn_multiplier_and_presents_the_total() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("2.0", "40"), &surface);
    let mut ends = watch(&flow);
    let started = Instant::now();

    flow.start_flow(&[RawSelection::checked(1, "2"), RawSelection::checked(2, "8")])?;

    let outcome = ends.recv().await.ok_or("flow never finished")??;

    assert_eq!(started.elapsed(), Duration::from_millis(2_500));
    assert_eq!(outcome.total_final_price(), dec("40"));
    assert_eq!(surface.highlights(), full_reveal(1));
    assert_eq!(flow.phase(), FlowPhase::Idle);
    assert!(flow.integrity_warnings().is_empty());

    let events = surface.events();

    assert_eq!(
        events.first(),
        Some(&SurfaceEvent::Trigger(false)),
        "trigger is disabled before anything else"
    );
    assert_eq!(
        events.iter().rev().take(3).cloned().collect::<Vec<_>>(),
        vec![
            SurfaceEvent::Trigger(true),
            SurfaceEvent::ShowResult {
                total: "40.00".to_string(),
                multiplier: "x2.0".to_string(),
            },
            SurfaceEvent::HideReel,
        ]
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn the_result_can_only_be_dismissed_once_the_flow_is_done() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("2.0", "40"), &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(200)).await;

    assert!(!flow.dismiss_result());

    ends.recv().await.ok_or("flow never finished")??;
    surface.clear();

    assert!(flow.dismiss_result());
    assert_eq!(surface.events(), vec![SurfaceEvent::HideResult]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn result_is_not_shown_before_the_settle_delay() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("3.0", "60"), &surface);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(1_550)).await;

    assert_eq!(flow.phase(), FlowPhase::Settling);
    assert_eq!(surface.highlights().last(), Some(&2));
    assert!(
        !surface
            .events()
            .iter()
            .any(|event| matches!(event, SurfaceEvent::ShowResult { .. }))
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalid_selection_never_contacts_the_service() -> TestResult {
    let surface = RecordingSurface::new();
    let mut service = MockPricingService::new();

    service.expect_get_multipliers().never();
    service.expect_generate_final_prices().never();

    let flow = flow_with(service, &surface);

    let empty = flow.start_flow(&[RawSelection::unchecked(1), RawSelection::unchecked(2)]);
    let zero = flow.start_flow(&[RawSelection::checked(1, "0")]);
    let unknown = flow.start_flow(&[RawSelection::checked(9, "1")]);

    assert!(matches!(
        empty,
        Err(FlowError::Validation(ValidationError::EmptySelection))
    ));
    assert!(matches!(
        zero,
        Err(FlowError::Validation(ValidationError::InvalidQuantity(1)))
    ));
    assert!(matches!(
        unknown,
        Err(FlowError::Validation(ValidationError::UnknownOption(9)))
    ));

    time::sleep(Duration::from_secs(5)).await;

    assert!(surface.events().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_multiplier_falls_back_to_the_first_entry() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("5.0", "100"), &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    let outcome = ends.recv().await.ok_or("flow never finished")??;

    assert_eq!(outcome.selected_multiplier(), dec("5.0"));
    assert_eq!(surface.highlights(), full_reveal(0));

    let warnings = flow.integrity_warnings();

    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings.first().map(|warning| warning.selected_multiplier),
        Some(dec("5.0"))
    );
    assert!(surface.events().contains(&SurfaceEvent::ShowResult {
        total: "100.00".to_string(),
        multiplier: "x5.0".to_string(),
    }));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abort_discards_the_flow_and_a_restart_is_clean() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("2.0", "40"), &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(350)).await;

    assert_eq!(surface.highlights(), vec![0, 1, 2]);
    assert!(flow.abort_flow());
    assert_eq!(flow.phase(), FlowPhase::Idle);
    assert_eq!(
        surface.events().iter().rev().take(3).cloned().collect::<Vec<_>>(),
        vec![
            SurfaceEvent::Trigger(true),
            SurfaceEvent::HideReel,
            SurfaceEvent::Highlight(None),
        ]
    );

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err(), "aborted flow must not report");
    assert_eq!(surface.highlights(), vec![0, 1, 2]);

    surface.clear();

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    ends.recv().await.ok_or("flow never finished")??;

    assert_eq!(surface.highlights(), full_reveal(1));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_second_start_while_running_is_refused() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("1.0", "20"), &surface);
    let mut ends = watch(&flow);

    let first = flow.start_flow(&[RawSelection::checked(1, "2")])?;

    assert!(matches!(
        flow.start_flow(&[RawSelection::checked(2, "1")]),
        Err(FlowError::Busy)
    ));

    ends.recv().await.ok_or("flow never finished")??;

    let second = flow.start_flow(&[RawSelection::checked(2, "1")])?;

    assert!(second > first);
    assert!(flow.abort_flow());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_failed_fetch_resets_the_flow() -> TestResult {
    let surface = RecordingSurface::new();
    let mut service = MockPricingService::new();

    service
        .expect_get_multipliers()
        .once()
        .return_once(|| Err(ServiceError::UnexpectedResponse("503".to_string())));

    service.expect_generate_final_prices().never();

    let flow = flow_with(service, &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "1")])?;

    let end = ends.recv().await.ok_or("flow never finished")?;

    assert_eq!(end, Err("failed to fetch multipliers".to_string()));
    assert_eq!(flow.phase(), FlowPhase::Idle);
    assert!(surface.highlights().is_empty());
    assert!(surface.events().contains(&SurfaceEvent::Error(
        "An error occurred while generating the price. Please try again.".to_string()
    )));
    assert_eq!(surface.events().last(), Some(&SurfaceEvent::Error(
        "An error occurred while generating the price. Please try again.".to_string()
    )));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn an_empty_multiplier_table_is_reported() -> TestResult {
    let surface = RecordingSurface::new();
    let mut service = MockPricingService::new();

    service
        .expect_get_multipliers()
        .once()
        .return_once(|| Ok(MultiplierOutcomeSet::default()));

    service.expect_generate_final_prices().never();

    let flow = flow_with(service, &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "1")])?;

    let end = ends.recv().await.ok_or("flow never finished")?;

    assert_eq!(end, Err(ResolverError::NoMultipliers.to_string()));
    assert!(!surface.events().contains(&SurfaceEvent::ShowReel(0)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalidating_the_snapshot_aborts_a_running_flow() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("2.0", "40"), &surface);
    let mut ends = watch(&flow);
    let invalidator = flow.invalidation_handle();

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(250)).await;

    assert!(flow.snapshot().is_some());
    assert!(invalidator.invalidate());

    let end = ends.recv().await.ok_or("flow never finished")?;

    assert_eq!(end, Err(FlowError::SnapshotInvalidated.to_string()));
    assert_eq!(flow.phase(), FlowPhase::Idle);
    assert!(flow.snapshot().is_none());

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err());
    assert_eq!(surface.highlights(), vec![0, 1]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abort_while_the_multipliers_are_in_flight_discards_them() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(
        DelayedService {
            multipliers_delay: Duration::from_millis(500),
            draw: Some(ResolvedOutcome::new(dec("2.0"), dec("40"))),
            ..DelayedService::default()
        },
        &surface,
    );
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(200)).await;

    assert_eq!(flow.phase(), FlowPhase::Resolving);
    assert!(flow.abort_flow());

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err(), "aborted flow must not report");
    assert!(surface.highlights().is_empty());
    assert!(!surface.events().contains(&SurfaceEvent::ShowReel(3)));
    assert!(flow.snapshot().is_none());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abort_while_the_draw_is_in_flight_discards_it() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(
        DelayedService {
            draw_delay: Duration::from_millis(500),
            draw: Some(ResolvedOutcome::new(dec("2.0"), dec("40"))),
            ..DelayedService::default()
        },
        &surface,
    );
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(200)).await;

    assert!(flow.abort_flow());

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err(), "aborted flow must not report");
    assert!(surface.highlights().is_empty());
    assert!(!surface.events().contains(&SurfaceEvent::ShowReel(3)));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn a_draw_error_after_abort_is_not_reported() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(
        DelayedService {
            draw_delay: Duration::from_millis(500),
            draw: None,
            ..DelayedService::default()
        },
        &surface,
    );
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(200)).await;

    assert!(flow.abort_flow());

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err(), "late draw error must not report");
    assert!(
        !surface
            .events()
            .iter()
            .any(|event| matches!(event, SurfaceEvent::Error(_)))
    );
    assert_eq!(flow.phase(), FlowPhase::Idle);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abort_while_settling_never_presents_the_result() -> TestResult {
    let surface = RecordingSurface::new();
    let flow = flow_with(drawing("3.0", "60"), &surface);
    let mut ends = watch(&flow);

    flow.start_flow(&[RawSelection::checked(1, "2")])?;

    time::sleep(Duration::from_millis(1_550)).await;

    assert_eq!(flow.phase(), FlowPhase::Settling);
    assert!(flow.abort_flow());

    time::sleep(Duration::from_secs(10)).await;

    assert!(ends.try_recv().is_err(), "aborted flow must not report");
    assert_eq!(surface.highlights(), full_reveal(2));
    assert!(
        !surface
            .events()
            .iter()
            .any(|event| matches!(event, SurfaceEvent::ShowResult { .. }))
    );
    assert_eq!(surface.events().last(), Some(&SurfaceEvent::Trigger(true)));

    Ok(())
}
