//! Timer-reset debounce for the restart → reload signal.
//!
//! Contract: every signal cancels any pending timer and starts a new one;
//! only a timer that survives the full window uncancelled fires the
//! action. This is what keeps browsers from reloading against a server
//! process that is still starting up.

use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

/// Debounced trigger: coalesces bursts of signals into one firing.
pub struct RestartDebouncer {
    tx: Sender<()>,
}

impl RestartDebouncer {
    /// Start the debounce thread. `on_fire` runs on that thread each time
    /// a window passes without a fresh signal.
    pub fn start(window: Duration, on_fire: impl Fn() + Send + 'static) -> Self {
        let (tx, rx) = channel::unbounded::<()>();

        std::thread::spawn(move || {
            loop {
                // Idle: block until the first signal; channel gone = done
                if rx.recv().is_err() {
                    return;
                }
                // Armed: each further signal resets the window
                loop {
                    match rx.recv_timeout(window) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => {
                            on_fire();
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            }
        });

        Self { tx }
    }

    /// Record a restart event (cancels any pending timer).
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_debouncer(window_ms: u64) -> (RestartDebouncer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let debouncer = RestartDebouncer::start(Duration::from_millis(window_ms), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, fired)
    }

    #[test]
    fn test_burst_coalesces_to_one_firing() {
        let (debouncer, fired) = counter_debouncer(50);

        debouncer.signal();
        debouncer.signal();
        debouncer.signal();

        std::thread::sleep(Duration::from_millis(250));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signal_resets_pending_timer() {
        let (debouncer, fired) = counter_debouncer(100);

        debouncer.signal();
        // Keep cancelling before the window elapses
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(50));
            debouncer.signal();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let (debouncer, fired) = counter_debouncer(30);

        debouncer.signal();
        std::thread::sleep(Duration::from_millis(150));
        debouncer.signal();
        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_signal_no_firing() {
        let (_debouncer, fired) = counter_debouncer(20);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
