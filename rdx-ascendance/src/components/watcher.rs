//! Watchers that react to the tick stream to produce higher-level work.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// What an interval watcher does when its interval elapses.
pub(crate) enum WatcherAction {
    /// Persist the game. Handled by the engine, which owns the store.
    AutoSave,
    Callback(Box<dyn FnMut() + Send + Sync>),
}

/// Accumulates simulated time and fires every `interval`.
///
/// Time only advances through tick deltas, so a paused engine never fires.
#[doc(hidden)]
pub(crate) struct IntervalWatcher {
    pub interval: Duration,
    elapsed: Duration,
    pub action: WatcherAction,
}

impl IntervalWatcher {
    pub(crate) fn new(interval: Duration, action: WatcherAction) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            action,
        }
    }

    /// Adds `delta` and returns `true` if the interval elapsed. A long frame
    /// fires once, not once per missed interval.
    pub(crate) fn advance(&mut self, delta: Duration) -> bool {
        self.elapsed += delta;
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_autosave(&self) -> bool {
        matches!(self.action, WatcherAction::AutoSave)
    }
}

/// Watches wall-clock time for calendar day changes in the game's timezone.
#[doc(hidden)]
pub(crate) struct DayWatcher {
    timezone: Tz,
    last_known_date: NaiveDate,
}

impl DayWatcher {
    pub(crate) fn new(timezone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            timezone,
            last_known_date: now.with_timezone(&timezone).date_naive(),
        }
    }

    /// Returns the new date if the day rolled over since the last check.
    pub(crate) fn check(&mut self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let current = now.with_timezone(&self.timezone).date_naive();
        if current != self.last_known_date {
            self.last_known_date = current;
            Some(current)
        } else {
            None
        }
    }
}
