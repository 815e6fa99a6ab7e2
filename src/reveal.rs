//! Reveal
//!
//! The cycling highlight that lands on an already-drawn multiplier. The
//! machine here is pure: it never sleeps and never looks at a clock, it only
//! reacts to `start`, `tick`, `finish` and `reset`. [`crate::flow`] drives it
//! on a timer.
//!
//! ```text
//! Idle --start--> Cycling --tick (threshold reached)--> Settling --finish--> Done
//!   ^                |                                     |                  |
//!   +------reset-----+-------------------------------------+------------------+
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::multipliers::MultiplierOutcomeSet;

/// Full passes over the set before settling.
pub const DEFAULT_FULL_CYCLES: u32 = 5;

/// Reveal machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// No animation in progress.
    Idle,

    /// Highlight is moving through the set.
    Cycling,

    /// Highlight is fixed on the winning entry.
    Settling,

    /// The reveal is over and the result may be shown.
    Done,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// The highlight moved to `highlighted`; still cycling.
    Advanced {
        /// Highlighted index
        highlighted: usize,
    },

    /// The cycle threshold was reached and the highlight was forced to `index`.
    Settled {
        /// Index of the winning entry
        index: usize,
    },
}

/// Errors driving the reveal machine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RevealError {
    /// There is nothing to cycle through.
    #[error("cannot reveal over an empty multiplier set")]
    EmptySet,

    /// The settle index is outside the set.
    #[error("settle index {index} is outside a set of {len} entries")]
    TargetOutOfRange {
        /// Requested settle index
        index: usize,
        /// Size of the set
        len: usize,
    },

    /// The event is not valid in the current state.
    #[error("cannot {event} while {state:?}")]
    InvalidTransition {
        /// State the machine was in
        state: RevealState,
        /// Rejected event
        event: &'static str,
    },
}

/// The drawn multiplier is not part of the set the reveal cycles through.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error(
    "selected multiplier {selected_multiplier} is not in the multiplier set; settling on index {fallback_index}"
)]
pub struct OutcomeMismatch {
    /// Multiplier returned by the draw
    pub selected_multiplier: Decimal,

    /// Index the reveal settles on instead
    pub fallback_index: usize,
}

/// Where the reveal will settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTarget {
    index: usize,
    mismatch: Option<OutcomeMismatch>,
}

impl SettleTarget {
    /// Locates the first entry equal to `selected_multiplier`, falling back to
    /// index 0 when there is none.
    pub fn locate(multipliers: &MultiplierOutcomeSet, selected_multiplier: Decimal) -> Self {
        match multipliers.position_of(selected_multiplier) {
            Some(index) => Self {
                index,
                mismatch: None,
            },
            None => Self {
                index: 0,
                mismatch: Some(OutcomeMismatch {
                    selected_multiplier,
                    fallback_index: 0,
                }),
            },
        }
    }

    /// Index to settle on.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Set when the drawn multiplier was missing from the set.
    pub fn mismatch(&self) -> Option<OutcomeMismatch> {
        self.mismatch
    }
}

/// Reveal state machine.
#[derive(Debug, Clone)]
pub struct Animator {
    len: usize,
    target: usize,
    full_cycles: u32,
    state: RevealState,
    position: usize,
    cycles: u32,
    highlighted: Option<usize>,
}

impl Animator {
    /// Create an idle animator over `len` entries that settles on `target`
    /// after `full_cycles` passes. A cycle count of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// - [`RevealError::EmptySet`]: `len` is 0.
    /// - [`RevealError::TargetOutOfRange`]: `target` is not below `len`.
    pub fn new(len: usize, target: usize, full_cycles: u32) -> Result<Self, RevealError> {
        if len == 0 {
            return Err(RevealError::EmptySet);
        }

        if target >= len {
            return Err(RevealError::TargetOutOfRange { index: target, len });
        }

        Ok(Self {
            len,
            target,
            full_cycles: full_cycles.max(1),
            state: RevealState::Idle,
            position: 0,
            cycles: 0,
            highlighted: None,
        })
    }

    /// Begin cycling from the first entry.
    ///
    /// # Errors
    ///
    /// Returns [`RevealError::InvalidTransition`] unless the machine is idle.
    pub fn start(&mut self) -> Result<(), RevealError> {
        self.expect_state(RevealState::Idle, "start")?;

        self.state = RevealState::Cycling;
        self.position = 0;
        self.cycles = 0;

        Ok(())
    }

    /// Advance one tick.
    ///
    /// Highlights the current position, then moves it on, counting a cycle
    /// each time it wraps to the start. When the count reaches the threshold
    /// the highlight jumps to the target and the machine starts settling.
    ///
    /// # Errors
    ///
    /// Returns [`RevealError::InvalidTransition`] unless the machine is cycling.
    pub fn tick(&mut self) -> Result<RevealStep, RevealError> {
        self.expect_state(RevealState::Cycling, "tick")?;

        let highlighted = self.position;

        self.highlighted = Some(highlighted);
        self.position = (self.position + 1) % self.len;

        if self.position == 0 {
            self.cycles += 1;
        }

        if self.cycles >= self.full_cycles {
            self.state = RevealState::Settling;
            self.highlighted = Some(self.target);

            return Ok(RevealStep::Settled { index: self.target });
        }

        Ok(RevealStep::Advanced { highlighted })
    }

    /// Finish settling. Returns the winning index.
    ///
    /// # Errors
    ///
    /// Returns [`RevealError::InvalidTransition`] unless the machine is settling.
    pub fn finish(&mut self) -> Result<usize, RevealError> {
        self.expect_state(RevealState::Settling, "finish")?;

        self.state = RevealState::Done;

        Ok(self.target)
    }

    /// Return to idle from any state and clear the highlight.
    pub fn reset(&mut self) {
        self.state = RevealState::Idle;
        self.position = 0;
        self.cycles = 0;
        self.highlighted = None;
    }

    /// Current state.
    pub fn state(&self) -> RevealState {
        self.state
    }

    /// The single highlighted index, if any.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Completed passes over the set.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Index the machine settles on.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Ticks spent cycling before the machine settles.
    pub fn ticks_to_settle(&self) -> usize {
        self.len * self.full_cycles as usize
    }

    fn expect_state(&self, state: RevealState, event: &'static str) -> Result<(), RevealError> {
        if self.state == state {
            Ok(())
        } else {
            Err(RevealError::InvalidTransition {
                state: self.state,
                event,
            })
        }
    }
}
