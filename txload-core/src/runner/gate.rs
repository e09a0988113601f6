use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Shared admission control for task executions.
///
/// Every simulated user claims a slot before running a task. The gate closes when the
/// iteration budget is spent, the deadline passes, or [`TaskGate::stop`] is called; waiting
/// users are woken as soon as that happens.
#[derive(Debug)]
pub struct TaskGate {
    counter: AtomicU64,
    iterations: Option<u64>,
    duration: Option<Duration>,
    deadline: OnceLock<Instant>,
    stopped: AtomicBool,
    notify: Notify,
}

impl TaskGate {
    pub fn new(iterations: Option<u64>, duration: Option<Duration>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            duration,
            deadline: OnceLock::new(),
            stopped: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn start_at(&self, started: Instant) {
        if self.deadline.get().is_some() {
            return;
        }

        // A deadline past what `Instant` can represent is no deadline.
        if let Some(deadline) = self
            .duration
            .and_then(|duration| started.checked_add(duration))
        {
            let _ = self.deadline.set(deadline);
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Number of slots handed out so far.
    pub fn claimed(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Claim the next task slot. Returns `false` once the gate is closed.
    pub fn next(&self) -> bool {
        if self.is_stopped() {
            return false;
        }

        if let Some(deadline) = self.deadline.get()
            && Instant::now() >= *deadline
        {
            self.stop();
            return false;
        }

        let idx = self.counter.fetch_add(1, Ordering::Relaxed);
        if let Some(total) = self.iterations {
            if idx >= total {
                self.stop();
                return false;
            }
            if idx + 1 == total {
                // Last slot: let idle users leave without waiting out their pause.
                self.stop();
            }
        }

        true
    }

    /// Sleep for `pause`, cut short by the deadline or a stop.
    ///
    /// Returns `false` if the gate closed before the pause elapsed.
    pub async fn wait(&self, pause: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return false;
        }

        let mut until = Instant::now().checked_add(pause);
        let mut hits_deadline = false;
        if let Some(deadline) = self.deadline.get()
            && until.is_none_or(|u| *deadline <= u)
        {
            until = Some(*deadline);
            hits_deadline = true;
        }

        match until {
            Some(until) => tokio::select! {
                _ = tokio::time::sleep_until(until.into()) => {}
                _ = &mut notified => return false,
            },
            None => {
                notified.await;
                return false;
            }
        }

        if hits_deadline {
            self.stop();
            return false;
        }
        !self.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterations_bound_total_claims() {
        let gate = TaskGate::new(Some(3), None);
        assert!(gate.next());
        assert!(gate.next());
        assert!(gate.next());
        assert!(!gate.next());
        assert!(!gate.next());
        assert!(gate.is_stopped());
    }

    #[test]
    fn unbounded_gate_runs_until_stopped() {
        let gate = TaskGate::new(None, None);
        for _ in 0..100 {
            assert!(gate.next());
        }
        gate.stop();
        assert!(!gate.next());
    }

    #[test]
    fn deadline_closes_gate() {
        let gate = TaskGate::new(None, Some(Duration::from_millis(10)));
        gate.start_at(Instant::now() - Duration::from_millis(20));
        assert!(!gate.next());
    }

    #[tokio::test]
    async fn stop_interrupts_wait() {
        let gate = std::sync::Arc::new(TaskGate::new(None, None));
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(Duration::from_secs(60)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.stop();

        let finished = tokio::time::timeout(Duration::from_secs(5), waiter).await;
        assert!(matches!(finished, Ok(Ok(false))));
    }

    #[tokio::test]
    async fn wait_is_capped_by_deadline() {
        let gate = TaskGate::new(None, Some(Duration::from_millis(30)));
        gate.start_at(Instant::now());

        let started = Instant::now();
        assert!(!gate.wait(Duration::from_secs(60)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(gate.is_stopped());
    }

    #[tokio::test]
    async fn short_wait_completes() {
        let gate = TaskGate::new(None, None);
        assert!(gate.wait(Duration::from_millis(1)).await);
    }

    #[test]
    fn unrepresentable_deadline_means_no_deadline() {
        let gate = TaskGate::new(None, Some(Duration::MAX));
        gate.start_at(Instant::now());
        assert!(gate.next());
        assert!(!gate.is_stopped());
    }

    #[tokio::test]
    async fn unrepresentable_pause_waits_for_stop() {
        let gate = std::sync::Arc::new(TaskGate::new(None, None));
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(Duration::MAX).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.stop();

        let finished = tokio::time::timeout(Duration::from_secs(5), waiter).await;
        assert!(matches!(finished, Ok(Ok(false))));
    }

    #[tokio::test]
    async fn unrepresentable_pause_is_capped_by_deadline() {
        let gate = TaskGate::new(None, Some(Duration::from_millis(30)));
        gate.start_at(Instant::now());
        assert!(!gate.wait(Duration::MAX).await);
        assert!(gate.is_stopped());
    }
}
