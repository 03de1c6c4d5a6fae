/// Cancelable one-shot countdown for the legacy delayed end overlay.
///
/// The host advances it with elapsed time, so it never reads a clock.

use std::time::Duration;

/// At most one pending countdown. Scheduling replaces any earlier one.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndTimer {
    remaining: Option<Duration>,
}

impl EndTimer {
    pub fn schedule(&mut self, delay: Duration) {
        self.remaining = Some(delay);
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }

    /// Count down by `elapsed`. True exactly once, when the countdown runs out.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        match remaining.checked_sub(elapsed) {
            Some(left) if !left.is_zero() => {
                self.remaining = Some(left);
                false
            }
            _ => {
                self.remaining = None;
                true
            }
        }
    }
}
