//! ScriptLimits — resource caps for script sessions.
//!
//! Caps operation count, call depth and container sizes through Rhai's
//! built-in limits, and terminates a run when its request is cancelled or
//! its wall-clock budget runs out. Hitting any of these surfaces as a
//! script diagnostic, not an engine fault.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine};
use scriptgate_core::config::LimitsConfig;

/// Termination token for a run whose request went away.
pub const CANCELLED: &str = "request cancelled";
/// Termination token for a run that exceeded its timeout.
pub const TIMED_OUT: &str = "script timed out";

/// Reading the clock on every operation is wasteful.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLimits {
    /// Maximum operations per run (0 = unlimited).
    pub max_operations: u64,
    /// Maximum function call depth (0 = engine default).
    pub max_call_levels: usize,
    /// Maximum string length in bytes (0 = unlimited).
    pub max_string_size: usize,
    /// Maximum array length (0 = unlimited).
    pub max_array_size: usize,
    /// Maximum map size (0 = unlimited).
    pub max_map_size: usize,
    pub timeout: Option<Duration>,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}

impl ScriptLimits {
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self {
            max_operations: config.max_operations,
            max_call_levels: config.max_call_levels,
            max_string_size: config.max_string_size,
            max_array_size: config.max_array_size,
            max_map_size: config.max_map_size,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }

    /// No caps at all. Cancellation still applies.
    pub fn unlimited() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 0,
            max_string_size: 0,
            max_array_size: 0,
            max_map_size: 0,
            timeout: None,
        }
    }

    /// Install these limits on a fresh engine. The timeout starts now.
    pub(crate) fn apply(&self, engine: &mut Engine, cancel: CancelFlag) {
        engine
            .set_max_operations(self.max_operations)
            .set_max_string_size(self.max_string_size)
            .set_max_array_size(self.max_array_size)
            .set_max_map_size(self.max_map_size);
        if self.max_call_levels > 0 {
            engine.set_max_call_levels(self.max_call_levels);
        }

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        engine.on_progress(move |operations| check_progress(operations, &cancel, deadline));
    }
}

/// Decide whether a run must stop. `Some(token)` terminates it.
pub(crate) fn check_progress(
    operations: u64,
    cancel: &CancelFlag,
    deadline: Option<Instant>,
) -> Option<Dynamic> {
    if cancel.is_cancelled() {
        tracing::debug!(operations, "terminating script: request cancelled");
        return Some(CANCELLED.into());
    }
    if operations % DEADLINE_CHECK_INTERVAL == 0
        && deadline.is_some_and(|deadline| Instant::now() >= deadline)
    {
        tracing::warn!(operations, "terminating script: timeout");
        return Some(TIMED_OUT.into());
    }
    None
}

/// Shared flag telling a running script that nobody is waiting for it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Cancel when the returned guard is dropped.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

#[derive(Debug)]
pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
