//! Fork-server preload module.
//!
//! Injected into a host process via `LD_PRELOAD`. At load time — before the
//! host's own `main` runs — this builds an [`InputRegistry`](registry::InputRegistry)
//! from the environment, installs a `SIGSYS` trap handler, and applies a
//! seccomp filter that routes a fixed set of syscalls through that handler.
//! The first time the host touches a registered input file, the handler
//! turns the process into a fork server: see [`forkserver`] for the loop
//! that drives the rest of the host's life from then on.
//!
//! This crate has no `fn main`: it is meant to be built as a `cdylib` and
//! loaded via `LD_PRELOAD`, not run directly.

pub mod arch;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod forkserver;
pub mod interceptor;
pub mod protocol;
pub mod registry;

use config::Config;
use error::LoadError;
use registry::InputRegistry;

#[cfg_attr(test, allow(dead_code))]
fn init() -> Result<(), LoadError> {
    let cfg = Config::from_env()?;

    let mut registry = InputRegistry::new();
    for path in &cfg.inputs {
        registry.register(path)?;
        tracing::info!(path = %path.display(), "registered fork-server input");
    }

    context::install(registry, cfg.timeout);
    interceptor::install()?;

    tracing::info!(
        timeout_secs = cfg.timeout.0,
        inputs = cfg.inputs.len(),
        "fork-server syscall interceptor installed"
    );
    Ok(())
}

/// Load-time entry point. Runs once, before the host's own `main`.
///
/// A failure here is always fatal: a half-initialized registry or a filter
/// that failed to install would make every later trap decision wrong, so we
/// log the cause and abort rather than let the host run unguarded.
///
/// Disabled under `cfg(test)`: the test binary is not the host process this
/// module is meant to instrument, and unconditionally requiring
/// `__SCM_TIMEOUT`/`__SCM_INPUT_0` just to run unit tests would defeat the
/// point of testing each component in isolation.
#[cfg_attr(not(test), ctor::ctor)]
#[cfg_attr(test, allow(dead_code))]
fn constructor() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = init() {
        tracing::error!(error = %err, "forksrv-preload failed to initialize");
        std::process::abort();
    }
}
