//! The clock side of the engine: a frame ticker and a wall-clock source.
//!
//! `SystemClock` is the single source of simulated time. It fires a
//! `TickEvent` at the configured resolution carrying the real elapsed delta
//! since the previous tick, so a late frame simply produces a larger delta.
//!
//! `TimeSource` answers "what time is it?" for calendar logic (streaks and
//! due dates). The engine never calls `Utc::now()` directly so tests can pin
//! the calendar with a `ManualTimeSource`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::ClockResolution;

/// A single frame of the master clock.
#[derive(Debug, Clone)]
pub struct TickEvent {
    /// Monotonic frame counter, starting at 1.
    pub tick_count: u64,
    /// Real time elapsed since the previous frame.
    pub delta: Duration,
    pub timestamp: Instant,
}

impl TickEvent {
    pub fn delta_secs(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    /// Time covered by this frame for a consumer that last applied a frame
    /// stamped `previous`. Frames the consumer missed are folded in.
    pub fn elapsed_since(&self, previous: Option<Instant>) -> Duration {
        match previous {
            Some(previous) => self.timestamp.saturating_duration_since(previous),
            None => self.delta,
        }
    }
}

/// The master ticker. Runs as its own task until a shutdown signal arrives.
pub struct SystemClock {
    resolution: ClockResolution,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SystemClock {
    pub fn new(resolution: ClockResolution, tick_sender: broadcast::Sender<Arc<TickEvent>>) -> Self {
        Self {
            resolution,
            tick_sender,
        }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.resolution.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        let mut tick_count = 0u64;
        debug!("SystemClock running with period {:?}", self.resolution.period());

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                now = interval.tick() => {
                    tick_count += 1;
                    let tick = TickEvent {
                        tick_count,
                        delta: now.saturating_duration_since(last),
                        timestamp: now,
                    };
                    last = now;
                    trace!("Tick #{} ({:?})", tick.tick_count, tick.delta);
                    // No receivers is fine; the dispatcher may not be up yet.
                    self.tick_sender.send(Arc::new(tick)).ok();
                }
            }
        }
        debug!("SystemClock stopped after {} ticks", tick_count);
    }
}

/// Wall-clock provider for calendar-aware rules.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = instant;
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn skipped_frames_are_folded_into_the_next_one() {
        let start = Instant::now();
        let frame = |tick_count: u64, at_ms: u64| TickEvent {
            tick_count,
            delta: Duration::from_millis(100),
            timestamp: start + Duration::from_millis(at_ms),
        };

        assert_eq!(frame(1, 100).elapsed_since(None), Duration::from_millis(100));
        let applied = frame(1, 100).timestamp;
        // Frames 2..=4 were dropped by a lagging consumer.
        assert_eq!(frame(5, 500).elapsed_since(Some(applied)), Duration::from_millis(400));
        assert_eq!(frame(5, 500).elapsed_since(Some(start + Duration::from_secs(1))), Duration::ZERO);
    }

    #[test]
    fn manual_time_source_advances() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let clock = ManualTimeSource::new(start);
        clock.advance(ChronoDuration::hours(30));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap());

        let shared = clock.clone();
        shared.set(start);
        assert_eq!(clock.now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn system_clock_emits_deltas() {
        let (tx, mut rx) = broadcast::channel(16);
        let (shutdown_tx, _) = broadcast::channel(1);
        let clock = SystemClock::new(ClockResolution::Custom { ticks_per_second: 10 }, tx);
        let handle = tokio::spawn(clock.run(shutdown_tx.subscribe()));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.tick_count, 1);
        assert_eq!(second.tick_count, 2);
        assert_eq!(second.delta, Duration::from_millis(100));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
