//! Carousel navigation state machine.
//!
//! `Idle -> Navigating` on an accepted request, `Navigating -> Idle` once the
//! settle deadline passes. Requests arriving while navigating, or pointing
//! past either end of the list, are rejected without touching state.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use vcarousel_models::SlideDirection;

use crate::state::CarouselState;

/// Phase of the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    Idle,
    Navigating,
}

/// An accepted navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub direction: SlideDirection,
}

/// Index navigation over a list of `len` items.
#[derive(Debug, Clone)]
pub struct CarouselNavigator {
    len: usize,
    state: CarouselState,
    settle_delay: Duration,
    settle_at: Option<Instant>,
}

impl CarouselNavigator {
    pub fn new(len: usize, settle_delay: Duration) -> Self {
        Self {
            len,
            state: CarouselState::default(),
            settle_delay,
            settle_at: None,
        }
    }

    pub fn state(&self) -> CarouselState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn phase(&self) -> NavPhase {
        if self.state.is_navigating {
            NavPhase::Navigating
        } else {
            NavPhase::Idle
        }
    }

    /// Whether a previous-button press would currently be accepted.
    pub fn can_go_previous(&self) -> bool {
        !self.state.is_navigating && self.state.current_index > 0
    }

    /// Whether a next-button press would currently be accepted.
    pub fn can_go_next(&self) -> bool {
        !self.state.is_navigating && self.state.current_index + 1 < self.len
    }

    pub fn go_next(&mut self, now: Instant) -> Option<Transition> {
        if !self.can_go_next() {
            debug!(index = self.state.current_index, "Next rejected");
            return None;
        }
        Some(self.begin(self.state.current_index + 1, SlideDirection::Left, now))
    }

    pub fn go_previous(&mut self, now: Instant) -> Option<Transition> {
        if !self.can_go_previous() {
            debug!(index = self.state.current_index, "Previous rejected");
            return None;
        }
        Some(self.begin(self.state.current_index - 1, SlideDirection::Right, now))
    }

    /// Jump to `index`; the slide direction follows the sign of the move.
    pub fn go_to(&mut self, index: usize, now: Instant) -> Option<Transition> {
        if self.state.is_navigating || index >= self.len || index == self.state.current_index {
            return None;
        }
        let direction = if index > self.state.current_index {
            SlideDirection::Left
        } else {
            SlideDirection::Right
        };
        Some(self.begin(index, direction, now))
    }

    fn begin(&mut self, to: usize, direction: SlideDirection, now: Instant) -> Transition {
        let from = self.state.current_index;
        self.state = CarouselState {
            current_index: to,
            is_navigating: true,
            slide_direction: direction,
        };
        // A newer accepted request always replaces the pending settle.
        self.settle_at = Some(now + self.settle_delay);
        debug!(from, to, direction = %direction, "Navigation started");
        Transition { from, to, direction }
    }

    /// Deadline at which the in-flight navigation settles.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.settle_at
    }

    /// Settle the navigation if its deadline has passed. Returns true when
    /// the navigator returned to idle.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.settle_at {
            Some(deadline) if now >= deadline => {
                self.settle_at = None;
                self.state.is_navigating = false;
                self.state.slide_direction = SlideDirection::None;
                true
            }
            _ => false,
        }
    }
}
