use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;

/// How a rendezvous ended. In every case the caller proceeds with the
/// `finished` items; outstanding work is never killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousOutcome {
    Completed,
    Cancelled { finished: usize },
    DeadlineExpired { finished: usize },
}

/// The worker side of a rendezvous: bump the counter after each item and
/// check the cancel flag between items.
#[derive(Clone)]
pub struct WorkerHandle {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn item_done(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Polling rendezvous between a foreground caller and work submitted to a
/// shared pool. The caller waits until every item reported done, the user
/// cancelled, or the deadline expired; workers keep their own pace.
pub struct ProgressTracker {
    total: usize,
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// `(items x 2 + 20) x 100 ms`, the stock deadline for pool work.
    pub fn deadline(items: usize) -> Duration {
        Duration::from_millis(((items * 2 + 20) * 100) as u64)
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            completed: Arc::clone(&self.completed),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn finished(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Block until done, cancelled or past the stock deadline, polling the
    /// counter and yielding between samples.
    pub fn wait(&self) -> RendezvousOutcome {
        self.wait_with_deadline(Self::deadline(self.total))
    }

    pub fn wait_with_deadline(&self, deadline: Duration) -> RendezvousOutcome {
        let start = Instant::now();
        loop {
            let finished = self.finished();
            if finished >= self.total {
                return RendezvousOutcome::Completed;
            }
            if self.cancelled.load(Ordering::SeqCst) {
                return RendezvousOutcome::Cancelled { finished };
            }
            if start.elapsed() >= deadline {
                warn!(
                    "progress deadline expired with {} of {} items outstanding",
                    self.total - finished,
                    self.total
                );
                return RendezvousOutcome::DeadlineExpired { finished };
            }
            std::thread::sleep(self.poll_interval.min(Duration::from_millis(10)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_formula() {
        assert_eq!(ProgressTracker::deadline(0), Duration::from_millis(2000));
        assert_eq!(ProgressTracker::deadline(5), Duration::from_millis(3000));
    }

    #[test]
    fn completes_when_all_items_report() {
        let tracker = ProgressTracker::new(3);
        let handle = tracker.handle();
        let worker = std::thread::spawn(move || {
            for _ in 0..3 {
                handle.item_done();
            }
        });
        assert_eq!(tracker.wait(), RendezvousOutcome::Completed);
        worker.join().unwrap();
    }

    #[test]
    fn cancel_is_cooperative() {
        let tracker = ProgressTracker::new(2);
        let handle = tracker.handle();
        handle.item_done();
        tracker.cancel();
        assert_eq!(
            tracker.wait(),
            RendezvousOutcome::Cancelled { finished: 1 }
        );
        assert!(handle.is_cancelled());
    }

    #[test]
    fn expired_deadline_reports_finished_count() {
        let tracker = ProgressTracker::new(2);
        tracker.handle().item_done();
        let outcome = tracker.wait_with_deadline(Duration::from_millis(20));
        assert_eq!(outcome, RendezvousOutcome::DeadlineExpired { finished: 1 });
    }
}
