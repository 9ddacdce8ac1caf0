//! Load-time configuration, read once from the environment.
//!
//! Mirrors the way `neurovisor`'s daemon entry point collects its own
//! settings into a single `Args` struct instead of scattering `env::var`
//! calls through the rest of the crate — except here the "entry point" is
//! the constructor, and the struct is consumed once to build the
//! [`crate::context::HandlerContext`].

use std::path::PathBuf;

use crate::error::LoadError;
use crate::registry::MAX_INPUTS;

/// Per-child CPU-time budget, seconds, parsed the way `atoi` does: leading
/// whitespace skipped, an optional sign, then digits consumed up to the
/// first non-digit, with no digits at all (or a negative result) giving 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub u64);

#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Timeout,
    pub inputs: Vec<PathBuf>,
}

impl Config {
    /// Reads `__SCM_TIMEOUT` and `__SCM_INPUT_0`, `__SCM_INPUT_1`, ... from
    /// the process environment. Scanning for inputs stops at the first
    /// missing index.
    pub fn from_env() -> Result<Self, LoadError> {
        let timeout = Self::read_timeout()?;
        let inputs = Self::read_inputs()?;
        Ok(Config { timeout, inputs })
    }

    fn read_timeout() -> Result<Timeout, LoadError> {
        let raw = std::env::var("__SCM_TIMEOUT").map_err(|_| LoadError::MissingTimeout)?;
        Ok(Timeout(atoi_permissive(&raw)))
    }

    fn read_inputs() -> Result<Vec<PathBuf>, LoadError> {
        let mut inputs = Vec::new();
        for index in 0..=MAX_INPUTS {
            let name = format!("__SCM_INPUT_{index}");
            let Ok(path) = std::env::var(&name) else {
                break;
            };
            if inputs.len() >= MAX_INPUTS {
                return Err(LoadError::TooManyInputs {
                    max: MAX_INPUTS,
                    got: inputs.len() + 1,
                });
            }
            inputs.push(PathBuf::from(path));
        }
        if inputs.is_empty() {
            return Err(LoadError::NoInputs);
        }
        Ok(inputs)
    }
}

/// Parses a leading integer out of `s` the way C's `atoi` does: skip leading
/// whitespace, consume an optional sign, then digits until the first
/// non-digit. No digits at all, or a negative result, gives 0.
fn atoi_permissive(s: &str) -> u64 {
    let bytes = s.trim_start().as_bytes();
    let mut idx = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            idx += 1;
            true
        }
        Some(b'+') => {
            idx += 1;
            false
        }
        _ => false,
    };

    let digits_start = idx;
    let mut value: u64 = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(bytes[idx] - b'0'));
        idx += 1;
    }

    if idx == digits_start || negative {
        0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_permissive_timeout() {
        std::env::set_var("__SCM_TIMEOUT", "  42 ");
        assert_eq!(Config::read_timeout().unwrap(), Timeout(42));
        std::env::remove_var("__SCM_TIMEOUT");
    }

    #[test]
    fn missing_timeout_is_fatal() {
        std::env::remove_var("__SCM_TIMEOUT");
        assert!(matches!(
            Config::read_timeout(),
            Err(LoadError::MissingTimeout)
        ));
    }

    #[test]
    fn garbage_timeout_defaults_to_zero() {
        std::env::set_var("__SCM_TIMEOUT", "not-a-number");
        assert_eq!(Config::read_timeout().unwrap(), Timeout(0));
        std::env::remove_var("__SCM_TIMEOUT");
    }

    #[test]
    fn timeout_takes_leading_digits_only() {
        std::env::set_var("__SCM_TIMEOUT", "5s");
        assert_eq!(Config::read_timeout().unwrap(), Timeout(5));
        std::env::remove_var("__SCM_TIMEOUT");
    }

    #[test]
    fn empty_timeout_defaults_to_zero() {
        std::env::set_var("__SCM_TIMEOUT", "");
        assert_eq!(Config::read_timeout().unwrap(), Timeout(0));
        std::env::remove_var("__SCM_TIMEOUT");
    }

    #[test]
    fn negative_timeout_defaults_to_zero() {
        std::env::set_var("__SCM_TIMEOUT", "-5");
        assert_eq!(Config::read_timeout().unwrap(), Timeout(0));
        std::env::remove_var("__SCM_TIMEOUT");
    }
}
