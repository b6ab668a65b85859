//! Run overrun detection.
//!
//! The watchdog is a timer thread independent of the worker's step loop. Every
//! time the budget interval elapses it calls its notifier once, then re-arms
//! for another interval unless cancellation has been requested. It never
//! touches step state.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::steps::step::panic_message;

/// Information passed to the notifier on each overrun tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrun {
    /// Time since the watchdog was armed.
    pub elapsed: Duration,
    /// The budget interval.
    pub budget: Duration,
    /// How many times the budget has been exceeded, starting at 1.
    pub count: u32,
}

/// Call the notifier, containing any panic to this tick.
fn notify_guarded(notify: &dyn Fn(Overrun), overrun: Overrun) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| notify(overrun))) {
        error!(
            "Watchdog notifier panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

/// An armed overrun timer.
///
/// Dropping the watchdog disarms it.
pub struct Watchdog {
    stop: Option<mpsc::Sender<()>>,
    budget: Duration,
}

impl Watchdog {
    /// Start a timer that fires `notify` every `budget` until disarmed or
    /// until `cancelled` is set.
    pub fn arm<F>(budget: Duration, cancelled: Arc<AtomicBool>, notify: F) -> Self
    where
        F: Fn(Overrun) + Send + Sync + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        debug!("Watchdog armed with budget {:?}", budget);
        // One timer thread calls the notifier in sequence, so a notification
        // never starts while the previous one is still running.
        thread::spawn(move || {
            let armed_at = Instant::now();
            let mut count = 0;
            loop {
                match stopped.recv_timeout(budget) {
                    Err(RecvTimeoutError::Timeout) => {
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        count += 1;
                        notify_guarded(
                            &notify,
                            Overrun {
                                elapsed: armed_at.elapsed(),
                                budget,
                                count,
                            },
                        );
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    // Explicit stop or the watchdog handle was dropped.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Watchdog stopped after {} notification(s)", count);
        });

        Self {
            stop: Some(stop),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_armed(&self) -> bool {
        self.stop.is_some()
    }

    /// Stop the timer. Does not wait for the timer thread.
    pub fn disarm(&mut self) {
        if let Some(stop) = self.stop.take() {
            // Thread may already have exited after a cancellation.
            let _ = stop.send(());
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}
