//! Index-based replay over a precomputed step log.
//!
//! Every engine produces its steps eagerly; the player only moves a cursor,
//! so stepping backwards is as cheap as stepping forwards.

use std::time::Duration;
use tracing::{debug, trace};

pub const MAX_SPEED: u32 = 16;

/// Delay between two shown steps at `speed`, never below one millisecond.
/// Also used to pace live searches that are not recorded up front.
pub fn tick_period(base: Duration, speed: u32) -> Duration {
    (base / speed.clamp(1, MAX_SPEED)).max(Duration::from_millis(1))
}

#[derive(Debug, Clone)]
pub struct StepPlayer<'a, T> {
    steps: &'a [T],
    index: usize,
    auto_play: bool,
    speed: u32,
}

impl<'a, T> StepPlayer<'a, T> {
    pub fn new(steps: &'a [T]) -> Self {
        StepPlayer {
            steps,
            index: 0,
            auto_play: false,
            speed: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&'a T> {
        self.steps.get(self.index)
    }

    pub fn is_at_end(&self) -> bool {
        self.index + 1 >= self.steps.len()
    }

    /// Moves one step forward. Returns false at the last step.
    pub fn next(&mut self) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Moves one step back. Returns false at the first step.
    pub fn previous(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Jumps to `index`, clamped to the last step.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.steps.len().saturating_sub(1));
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.auto_play = false;
    }

    pub fn is_auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn toggle_auto_play(&mut self) {
        self.auto_play = !self.auto_play;
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn speed_more(&mut self) {
        self.speed = (self.speed * 2).min(MAX_SPEED);
    }

    pub fn speed_less(&mut self) {
        self.speed = (self.speed / 2).max(1);
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(1, MAX_SPEED);
    }

    pub fn tick_interval(&self, base: Duration) -> Duration {
        tick_period(base, self.speed)
    }

    /// Calls `on_step` for the current step and then for every following step,
    /// one per tick. Returns how many steps were shown.
    pub async fn autoplay<F>(&mut self, base: Duration, mut on_step: F) -> usize
    where
        F: FnMut(usize, &'a T),
    {
        let Some(first) = self.current() else {
            return 0;
        };

        let period = self.tick_interval(base);
        debug!("autoplay from step {} every {period:?}", self.index);
        self.auto_play = true;

        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        on_step(self.index, first);
        let mut shown = 1;

        while self.next() {
            ticker.tick().await;
            trace!("tick {}", self.index);
            if let Some(step) = self.current() {
                on_step(self.index, step);
                shown += 1;
            }
        }

        self.auto_play = false;
        shown
    }
}
