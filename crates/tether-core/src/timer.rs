//! One-shot timers keyed by elapsed simulation time
//!
//! Each scheduled timer gets a unique [`TimerHandle`]. Callers keep the handle of the
//! action they started and compare it when the timer fires, so a completion from a
//! superseded action can be recognised and ignored even if it was never cancelled.

/// Token identifying one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Scheduled<E> {
    handle: TimerHandle,
    remaining: f32,
    event: E,
}

/// Pending one-shot timers carrying an event payload
#[derive(Debug)]
pub struct TimerManager<E> {
    next_id: u64,
    timers: Vec<Scheduled<E>>,
}

impl<E> TimerManager<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Schedule `event` to fire after `delay` seconds
    pub fn schedule(&mut self, delay: f32, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Scheduled {
            handle,
            remaining: delay.max(0.0),
            event,
        });
        handle
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.handle != handle);
        self.timers.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|timer| timer.handle == handle)
    }

    /// Seconds left before the timer fires
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.timers
            .iter()
            .find(|timer| timer.handle == handle)
            .map(|timer| timer.remaining)
    }

    /// Advance all timers and return the ones that expired, earliest deadline first
    pub fn advance(&mut self, dt: f32) -> Vec<(TimerHandle, E)> {
        for timer in &mut self.timers {
            timer.remaining -= dt;
        }

        let mut fired = Vec::new();
        let mut index = 0;
        while index < self.timers.len() {
            if self.timers[index].remaining <= 0.0 {
                fired.push(self.timers.swap_remove(index));
            } else {
                index += 1;
            }
        }

        fired.sort_by(|a, b| {
            a.remaining
                .total_cmp(&b.remaining)
                .then(a.handle.cmp(&b.handle))
        });
        fired
            .into_iter()
            .map(|timer| (timer.handle, timer.event))
            .collect()
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

impl<E> Default for TimerManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_after_delay() {
        let mut timers = TimerManager::new();
        let handle = timers.schedule(0.5, "dodge");

        assert!(timers.advance(0.3).is_empty());
        assert!(timers.is_pending(handle));

        let fired = timers.advance(0.3);
        assert_eq!(fired, vec![(handle, "dodge")]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = TimerManager::new();
        let handle = timers.schedule(0.1, 1);
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert!(timers.advance(1.0).is_empty());
    }

    #[test]
    fn test_independent_timers_fire_in_deadline_order() {
        let mut timers = TimerManager::new();
        let slow = timers.schedule(0.4, "camera");
        let fast = timers.schedule(0.2, "roll");

        let fired = timers.advance(1.0);
        assert_eq!(fired, vec![(fast, "roll"), (slow, "camera")]);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut timers = TimerManager::new();
        let a = timers.schedule(1.0, ());
        let b = timers.schedule(1.0, ());
        assert_ne!(a, b);
        assert_eq!(timers.len(), 2);
    }
}
