use std::cell::Cell;

/// Where a browser is in its two-phase close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloseState {
    #[default]
    Open,
    Closing,
    Closed,
}

/// Close negotiation for one browser.
///
/// The first close query starts the close and is refused; queries keep being
/// refused until the engine reports completion through [`CloseTracker::finish`].
#[derive(Debug, Default)]
pub struct CloseTracker {
    state: Cell<CloseState>,
}

impl CloseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CloseState {
        self.state.get()
    }

    /// Moves to `Closing`. Returns `false` if the browser is already closed
    /// and nothing should be started.
    pub fn begin(&self) -> bool {
        if self.state.get() == CloseState::Closed {
            return false;
        }
        self.state.set(CloseState::Closing);
        true
    }

    /// Answers a close query. `start` runs when the browser is still open.
    pub fn try_close(&self, start: impl FnOnce()) -> bool {
        match self.state.get() {
            CloseState::Closed => true,
            CloseState::Closing => false,
            CloseState::Open => {
                start();
                false
            }
        }
    }

    pub fn finish(&self) {
        self.state.set(CloseState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_try_close_refuses_until_finished() {
        let tracker = CloseTracker::new();
        let started = Cell::new(0);
        let start = || {
            started.set(started.get() + 1);
            tracker.begin();
        };

        assert!(!tracker.try_close(start));
        assert_eq!(tracker.state(), CloseState::Closing);
        assert!(!tracker.try_close(|| started.set(started.get() + 1)));
        assert_eq!(started.get(), 1);

        tracker.finish();
        assert!(tracker.try_close(|| started.set(started.get() + 1)));
        assert_eq!(started.get(), 1);
    }

    #[test]
    fn test_begin_after_close_is_ignored() {
        let tracker = CloseTracker::new();
        assert!(tracker.begin());
        assert!(tracker.begin());
        tracker.finish();
        assert!(!tracker.begin());
        assert_eq!(tracker.state(), CloseState::Closed);
    }
}
