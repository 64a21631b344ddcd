//! Controls overlay visibility timer.

use std::time::Duration;

use tokio::time::Instant;

/// Shows the controls overlay on pointer activity and hides it after a
/// period of inactivity. At most one hide deadline is pending; every
/// activity event replaces it.
#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    enabled: bool,
    visible: bool,
    hide_at: Option<Instant>,
    idle_hide: Duration,
    leave_hide: Duration,
}

impl ControlsVisibility {
    pub fn new(enabled: bool, idle_hide: Duration, leave_hide: Duration) -> Self {
        Self {
            enabled,
            visible: enabled,
            hide_at: None,
            idle_hide,
            leave_hide,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Pointer moved over the player.
    pub fn pointer_move(&mut self, now: Instant) {
        self.show_until(now + self.idle_hide);
    }

    /// Pointer left the player.
    pub fn pointer_leave(&mut self, now: Instant) {
        self.show_until(now + self.leave_hide);
    }

    /// Active item changed: show the controls with a fresh idle deadline.
    pub fn reset(&mut self, now: Instant) {
        self.show_until(now + self.idle_hide);
    }

    fn show_until(&mut self, deadline: Instant) {
        if !self.enabled {
            return;
        }
        self.visible = true;
        self.hide_at = Some(deadline);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    /// Hide the controls if the pending deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.hide_at = None;
                self.visible = false;
                true
            }
            _ => false,
        }
    }
}
