//! Fatal load-time errors.
//!
//! Every variant here ends the same way: the constructor logs it and aborts.
//! There is no recovery path for a fork server that failed to set up, since a
//! half-installed filter or an unresolved input would make every later
//! syscall trap decision meaningless.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("__SCM_TIMEOUT is not set")]
    MissingTimeout,

    #[error("no __SCM_INPUT_0 was set; at least one input file is required")]
    NoInputs,

    #[error("too many input files registered (max {max}, got {got})")]
    TooManyInputs { max: usize, got: usize },

    #[error("cannot stat input file {path:?}: {source}")]
    StatFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build seccomp filter: {0}")]
    FilterBuild(String),

    #[error("failed to install signal handler: {0}")]
    SignalInstall(std::io::Error),

    #[error("prctl(PR_SET_NO_NEW_PRIVS) failed: {0}")]
    NoNewPrivs(std::io::Error),

    #[error("failed to apply seccomp filter: {0}")]
    FilterApply(String),
}
