use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::EngineError;

/// Body of a timer-driven background loop.
pub(crate) trait Tick: Send + 'static {
    fn tick(&mut self, now: Instant);

    /// Runs once on the loop thread after the last tick.
    fn finish(&mut self) {}
}

/// A background thread polling a [`Tick`] at a fixed interval until stopped.
#[derive(Debug)]
pub(crate) struct Worker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn<T: Tick>(
        name: String,
        interval: Duration,
        mut body: T,
    ) -> Result<Self, EngineError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    body.tick(Instant::now());
                    thread::sleep(interval);
                }
                body.finish();
            })
            .map_err(EngineError::Spawn)?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signals the loop and waits for the thread to exit.
    ///
    /// Returns `false` when the loop thread panicked.
    pub(crate) fn stop(&mut self) -> bool {
        self.running.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
