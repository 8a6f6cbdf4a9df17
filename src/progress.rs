//! Progress observers. Engines report synchronously from their own loop, so a
//! sink must return quickly.

use std::sync::mpsc::SyncSender;

pub trait Progress {
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> Progress for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _fraction: f64) {}
}

pub const NOTIFICATIONS_PER_RUN: usize = 50;

#[derive(Clone, Copy, Debug)]
pub struct StepThrottle {
    total: usize,
    interval: usize,
}

impl StepThrottle {
    pub fn new(total: usize, notifications: usize) -> Self {
        let total = total.max(1);
        Self {
            total,
            interval: (total / notifications.max(1)).max(1),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Whether unit `done` should be reported; the first unit always is.
    #[inline]
    pub fn is_due(&self, done: usize) -> bool {
        done == 1 || done % self.interval == 0
    }

    #[inline]
    pub fn fraction(&self, done: usize) -> f64 {
        done as f64 / self.total as f64
    }
}

/// Forwards only strictly increasing 5% milestones.
#[derive(Debug)]
pub struct Milestones<P> {
    inner: P,
    last: Option<u32>,
}

impl<P: Progress> Milestones<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, last: None }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Progress> Progress for Milestones<P> {
    fn report(&mut self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u32;
        let milestone = percent / 5 * 5;
        if self.last.is_none_or(|last| milestone > last) {
            self.last = Some(milestone);
            self.inner.report(milestone as f64 / 100.0);
        }
    }
}

/// Hands fractions to another thread through a bounded queue. Never blocks:
/// when the queue is full or the receiver is gone the update is dropped.
#[derive(Debug)]
pub struct ChannelProgress {
    sender: SyncSender<f64>,
}

impl ChannelProgress {
    pub fn new(sender: SyncSender<f64>) -> Self {
        Self { sender }
    }
}

impl Progress for ChannelProgress {
    fn report(&mut self, fraction: f64) {
        let _ = self.sender.try_send(fraction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn throttle_reports_first_and_every_interval() {
        let throttle = StepThrottle::new(1000, NOTIFICATIONS_PER_RUN);
        assert_eq!(throttle.interval(), 20);
        let due: Vec<usize> = (1..=1000).filter(|&k| throttle.is_due(k)).collect();
        assert_eq!(due.len(), 51);
        assert_eq!(due[0], 1);
        assert_eq!(due[1], 20);
        let tiny = StepThrottle::new(0, NOTIFICATIONS_PER_RUN);
        assert_eq!(tiny.total(), 1);
        assert!(tiny.is_due(1));
    }

    #[test]
    fn milestones_are_strictly_increasing_multiples_of_five() {
        let mut seen = Vec::new();
        {
            let mut sink = Milestones::new(|f: f64| seen.push(f));
            for value in [0.0, 0.01, 0.04, 0.05, 0.07, 0.12, 0.11, 0.5, 1.0, 1.0] {
                sink.report(value);
            }
        }
        assert_eq!(seen, vec![0.0, 0.05, 0.1, 0.5, 1.0]);
    }

    #[test]
    fn channel_progress_drops_when_full() {
        let (tx, rx) = sync_channel(2);
        let mut sink = ChannelProgress::new(tx);
        for value in [0.1, 0.2, 0.3, 0.4] {
            sink.report(value);
        }
        drop(sink);
        let received: Vec<f64> = rx.iter().collect();
        assert_eq!(received, vec![0.1, 0.2]);
    }
}
