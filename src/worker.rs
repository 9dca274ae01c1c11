//! The background save thread.

use crate::error::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Shortest interval the worker will wait between saves.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Background thread that calls a save closure once per interval.
///
/// A panicking save is logged and the loop carries on with the next tick.
/// The thread sleeps on a channel. Stopping (or dropping) the worker
/// disconnects that channel, which wakes the thread immediately; it then exits
/// and is joined, so nothing outlives the worker.
pub struct SaveWorker {
    interval: Duration,
    stop_tx: Option<mpsc::Sender<()>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl SaveWorker {
    /// Spawn a worker that runs `save` every `interval` until stopped. The
    /// first save happens one interval after spawning.
    pub fn spawn<F>(interval: Duration, mut save: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join_handle = thread::Builder::new()
            .name("file-map-save".into())
            .spawn(move || {
                tracing::debug!(?interval, "save worker started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let outcome = panic::catch_unwind(AssertUnwindSafe(&mut save));
                            if let Err(payload) = outcome {
                                let msg = panic_message(&*payload);
                                tracing::error!(panic = msg, "background save panicked");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("save worker stopped");
            })?;

        Ok(Self {
            interval,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    /// Interval between saves, after clamping to [`MIN_INTERVAL`].
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signal the thread and wait for it to exit. A save that is already
    /// running finishes first. Calling this twice is harmless.
    pub fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(h) = self.join_handle.take() {
            if h.join().is_err() {
                tracing::error!("save worker panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SaveWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveWorker")
            .field("interval", &self.interval)
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut worker = SaveWorker::spawn(Duration::from_millis(10), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        worker.stop();
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several saves, got {seen}");

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn drop_wakes_a_long_sleep() {
        let worker = SaveWorker::spawn(Duration::from_secs(3600), || {}).unwrap();
        let started = Instant::now();
        drop(worker);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut worker = SaveWorker::spawn(Duration::ZERO, || {}).unwrap();
        assert_eq!(worker.interval(), MIN_INTERVAL);
        worker.stop();
        worker.stop();
    }

    #[test]
    fn panicking_save_does_not_end_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut worker = SaveWorker::spawn(Duration::from_millis(10), move || {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first save blew up");
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        worker.stop();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let s: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*s), "static");
        assert_eq!(panic_message(&*owned), "owned");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }
}
