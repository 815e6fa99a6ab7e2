//! Reveal Surface

use mockall::automock;

use crate::{multipliers::MultiplierOutcomeSet, presenter::Presentation};

/// The user interface a pricing flow renders to.
///
/// Calls arrive from the flow in order and never concurrently for the same
/// flow. Implementations must not call back into the flow.
#[automock]
pub trait RevealSurface: Send + Sync {
    /// Enable or disable the "generate price" trigger.
    fn set_trigger_enabled(&self, enabled: bool);

    /// Show the reel with the multipliers in display order.
    fn show_reel(&self, multipliers: &MultiplierOutcomeSet);

    /// Highlight the entry at `index`, or nothing.
    fn highlight(&self, index: Option<usize>);

    /// Hide the reel.
    fn hide_reel(&self);

    /// Show the final totals.
    fn show_result(&self, presentation: &Presentation);

    /// Hide any previous result.
    fn hide_result(&self);

    /// Show a user-facing error message.
    fn show_error(&self, message: &str);
}
