// Trailing-edge write coalescing
// One pending value and at most one timer task per artifact. schedule() marks the
// artifact dirty and pushes the deadline back; the running timer picks that up.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::debug;

type FlushFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct Pending<T> {
    value: Option<T>,
    deadline: Instant,
    timer_running: bool,
}

pub struct Debouncer<T> {
    name: &'static str,
    delay: Duration,
    runtime: Handle,
    flush: FlushFn<T>,
    pending: Arc<Mutex<Pending<T>>>,
    /// Held for the duration of a flush so flush_now() waits for an in-flight write
    writing: Arc<tokio::sync::Mutex<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(name: &'static str, delay: Duration, runtime: Handle, flush: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            delay,
            runtime,
            flush: Arc::new(move |value: T| -> BoxFuture<'static, ()> { Box::pin(flush(value)) }),
            pending: Arc::new(Mutex::new(Pending {
                value: None,
                deadline: Instant::now(),
                timer_running: false,
            })),
            writing: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Replace the pending value and push the deadline back. Never blocks.
    pub fn schedule(&self, value: T) {
        let mut pending = self.pending.lock();
        pending.value = Some(value);
        pending.deadline = Instant::now() + self.delay;
        if pending.timer_running {
            return;
        }
        pending.timer_running = true;

        let name = self.name;
        let flush = self.flush.clone();
        let state = self.pending.clone();
        let writing = self.writing.clone();
        self.runtime.spawn(async move {
            loop {
                let deadline = state.lock().deadline;
                tokio::time::sleep_until(deadline).await;

                let _guard = writing.lock().await;
                let value = {
                    let mut pending = state.lock();
                    if pending.deadline > Instant::now() {
                        continue;
                    }
                    pending.timer_running = false;
                    pending.value.take()
                };
                if let Some(value) = value {
                    debug!("[Debouncer:{}] Flushing on trailing edge", name);
                    flush(value).await;
                }
                return;
            }
        });
    }

    /// Write the pending value immediately, if any. Used on shutdown.
    pub async fn flush_now(&self) {
        let _guard = self.writing.lock().await;
        let value = self.pending.lock().value.take();
        if let Some(value) = value {
            debug!("[Debouncer:{}] Flushing on demand", self.name);
            (self.flush)(value).await;
        }
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.lock().value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(delay_ms: u64) -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = written.clone();
        let debouncer = Debouncer::new("test", Duration::from_millis(delay_ms), Handle::current(), move |v| {
            let sink = sink.clone();
            async move { sink.lock().push(v) }
        });
        (debouncer, written)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_single_write_with_last_value() {
        let (debouncer, written) = recording(1000);
        for v in 1..=25 {
            debouncer.schedule(v);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(written.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(*written.lock(), vec![25]);
        assert!(!debouncer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_restarts_on_each_schedule() {
        let (debouncer, written) = recording(1000);
        debouncer.schedule(1);
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.schedule(2);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(written.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*written.lock(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_settle_periods_write_separately() {
        let (debouncer, written) = recording(1000);
        debouncer.schedule(1);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        debouncer.schedule(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(*written.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_now_writes_pending_and_cancels_timer() {
        let (debouncer, written) = recording(1000);
        debouncer.schedule(7);
        debouncer.flush_now().await;
        assert_eq!(*written.lock(), vec![7]);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(*written.lock(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_timer_picks_up_value_scheduled_after_flush_now() {
        let (debouncer, written) = recording(1000);
        debouncer.schedule(1);
        debouncer.flush_now().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule(2);
        assert!(debouncer.pending.lock().timer_running);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(*written.lock(), vec![1, 2]);
        assert!(!debouncer.pending.lock().timer_running);
    }

    #[tokio::test]
    async fn test_flush_now_without_pending_is_noop() {
        let (debouncer, written) = recording(1000);
        debouncer.flush_now().await;
        assert!(written.lock().is_empty());
    }
}
