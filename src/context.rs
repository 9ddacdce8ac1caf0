//! Process-wide state the trap handler needs, captured once at install time.
//!
//! Modeled as an explicit handler context assembled at install time rather
//! than a collection of lazily initialized globals: the registry and timeout
//! only exist once `Config::from_env` and `InputRegistry::register` have both
//! succeeded, so there is a real assembly order to capture, and a single
//! `OnceLock<HandlerContext>` makes "fully assembled or not installed at all"
//! the only two states instead of N independently-racy globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::config::Timeout;
use crate::registry::InputRegistry;

pub struct HandlerContext {
    pub registry: InputRegistry,
    pub timeout: Timeout,
    /// Whether the fork server has started. Transitions false -> true
    /// exactly once per process; inherited as `true` by every forked child,
    /// which is what stops a child from ever re-entering the server.
    started: AtomicBool,
}

impl HandlerContext {
    fn new(registry: InputRegistry, timeout: Timeout) -> Self {
        Self {
            registry,
            timeout,
            started: AtomicBool::new(false),
        }
    }

    /// Marks the server started if it wasn't already. Returns `true` only on
    /// the transition (i.e. to the caller that should actually run the
    /// init banner and enter the command loop).
    pub fn mark_started(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

static CONTEXT: OnceLock<HandlerContext> = OnceLock::new();

/// Installs the global context. Must be called exactly once, from the
/// constructor, before the signal handler is installed.
pub fn install(registry: InputRegistry, timeout: Timeout) {
    CONTEXT
        .set(HandlerContext::new(registry, timeout))
        .unwrap_or_else(|_| panic!("forksrv-preload context installed twice"));
}

/// Fetches the global context. Only ever called from the trap handler after
/// [`install`] has run, so this is always `Some` in practice; a trap
/// delivered before installation would itself be a sign the filter somehow
/// installed before the context, which cannot happen given the constructor's
/// fixed order of operations.
pub fn get() -> &'static HandlerContext {
    CONTEXT.get().expect("forksrv-preload context not installed")
}
