//! Debounced recompute trigger.
//!
//! The host marks the scheduler dirty when the viewport settles and reports
//! every render tick. A recompute is due once the scheduler is dirty and no
//! activity has been seen for the quiet period. Each granted recompute gets
//! a [`Generation`]; a result whose generation is no longer current was
//! overtaken by a newer trigger and should be discarded.

use std::time::Duration;

use web_time::Instant;

/// Identifies one granted recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Sequence number, starting at 1 for the first granted recompute.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Dirty flag plus debounce timer.
#[derive(Debug, Clone)]
pub struct RecomputeScheduler {
    quiet_period: Duration,
    dirty: bool,
    last_activity: Option<Instant>,
    issued: u64,
}

impl Default for RecomputeScheduler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUIET_PERIOD)
    }
}

impl RecomputeScheduler {
    /// Quiet period after the last render tick before recomputing.
    pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(100);

    /// Create a clean scheduler with the given quiet period.
    #[must_use]
    pub const fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            dirty: false,
            last_activity: None,
            issued: 0,
        }
    }

    /// The viewport settled; a recompute is needed.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty = true;
        self.last_activity = Some(now);
    }

    /// A frame was rendered; pushes the deadline out.
    pub fn tick(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Whether a recompute is pending.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// When a pending recompute becomes due, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        self.last_activity.map(|last| last + self.quiet_period)
    }

    /// Grant a recompute if one is due at `now`, clearing the dirty flag.
    pub fn poll(&mut self, now: Instant) -> Option<Generation> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.dirty = false;
        self.issued += 1;
        tracing::trace!(generation = self.issued, "recompute granted");
        Some(Generation(self.issued))
    }

    /// Whether `generation` is the most recently granted one.
    #[must_use]
    pub const fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn clean_scheduler_never_fires() {
        let mut scheduler = RecomputeScheduler::default();
        let t0 = Instant::now();
        scheduler.tick(t0);
        assert_eq!(scheduler.poll(t0 + MS * 500), None);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn fires_once_after_quiet_period() {
        let mut scheduler = RecomputeScheduler::default();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        assert_eq!(scheduler.poll(t0 + MS * 99), None);
        let generation = scheduler.poll(t0 + MS * 100);
        assert!(generation.is_some());
        assert!(!scheduler.is_dirty());
        assert_eq!(scheduler.poll(t0 + MS * 300), None);
    }

    #[test]
    fn render_ticks_debounce_the_trigger() {
        let mut scheduler = RecomputeScheduler::default();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        for step in 1..=5 {
            scheduler.tick(t0 + MS * (step * 50));
            assert_eq!(scheduler.poll(t0 + MS * (step * 50 + 60)), None);
        }
        assert!(scheduler.poll(t0 + MS * 350).is_some());
    }

    #[test]
    fn newer_trigger_makes_older_result_stale() {
        let mut scheduler = RecomputeScheduler::new(MS * 10);
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        let first = scheduler.poll(t0 + MS * 10).unwrap_or(Generation(0));
        assert!(scheduler.is_current(first));

        scheduler.mark_dirty(t0 + MS * 20);
        let second = scheduler.poll(t0 + MS * 30).unwrap_or(Generation(0));
        assert!(!scheduler.is_current(first));
        assert!(scheduler.is_current(second));
        assert!(second > first);
        assert_eq!(second.get(), 2);
    }
}
