//! Trailing-edge debounce timer owned by a single editor session.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Runs a job once a quiet period of `delay` has passed since the last
/// [`Debouncer::schedule`] call. Scheduling again replaces the pending job.
///
/// The pending job is aborted on [`Debouncer::cancel`] and on drop, so
/// nothing fires after the owning session is gone.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel() {
            debug!("Debounce restarted");
        }
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }

    /// Aborts the pending job. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_job_runs() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));

        for i in 1..=5 {
            debouncer.schedule(counting_job(&fired, i));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 5);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        debouncer.schedule(counting_job(&fired, 1));
        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(1000));
            debouncer.schedule(counting_job(&fired, 1));
        }
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
