//! Tick scheduling.
//!
//! The bridge does not own a thread. Something outside calls its poll
//! function on every cycle; [`TickRegistry`] is that registration point and
//! [`TickHost`] is a small ready-made implementation driving named ticks on
//! the current thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

/// A tick function. Returning `false` asks to be unregistered.
pub type TickFn = Box<dyn FnMut() -> bool + Send>;

/// Something that calls registered functions periodically.
pub trait TickRegistry {
    /// Register `tick` under `name`.
    fn register_tick(&mut self, name: String, tick: TickFn);
}

/// Cloneable handle that stops a running [`TickHost`].
#[derive(Debug, Clone, Default)]
pub struct TickStop(Arc<AtomicBool>);

impl TickStop {
    /// Ask the host to return from [`TickHost::run`] after the current cycle.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs named ticks in registration order.
#[derive(Default)]
pub struct TickHost {
    ticks: Vec<(String, TickFn)>,
    stop: TickStop,
}

impl TickHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that can stop [`run`](Self::run) from another thread.
    pub fn stop_handle(&self) -> TickStop {
        self.stop.clone()
    }

    /// Request a stop.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Number of registered ticks.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// True when no tick is registered.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Registered tick names, in run order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ticks.iter().map(|(name, _)| name.as_str())
    }

    /// Run every tick once. Ticks returning `false` are removed.
    ///
    /// Returns how many ticks remain registered.
    pub fn run_once(&mut self) -> usize {
        self.ticks.retain_mut(|(name, tick)| {
            let keep = tick();
            if !keep {
                debug!(tick = %name, "[TICK] Unregistered");
            }
            keep
        });
        self.ticks.len()
    }

    /// Tick every `interval` until stopped or no tick is left.
    pub fn run(&mut self, interval: Duration) {
        loop {
            if self.stop.is_stopped() {
                trace!("[TICK] Stop requested");
                break;
            }
            if self.run_once() == 0 {
                debug!("[TICK] No ticks left");
                break;
            }
            thread::sleep(interval);
        }
    }
}

impl TickRegistry for TickHost {
    fn register_tick(&mut self, name: String, tick: TickFn) {
        debug!(tick = %name, "[TICK] Registered");
        self.ticks.push((name, tick));
    }
}

impl fmt::Debug for TickHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHost")
            .field("ticks", &self.names().collect::<Vec<_>>())
            .field("stop", &self.stop)
            .finish()
    }
}
