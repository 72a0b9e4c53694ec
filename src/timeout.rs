//! Effective-timeout resolution.
//!
//! Three candidate sources, strict precedence: a truthy environment override
//! beats the per-test value, which beats the global default. The environment
//! is consulted fresh on every invocation so the same decorated test can
//! resolve differently under different conditions; nothing is cached and
//! nothing is stored back on the test.

use crate::errors::HarnessError;

/// Applied when neither an override nor a per-test timeout is present.
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Process-wide override variable. Absent or "0" means no override.
pub const TIMEOUT_ENV_VAR: &str = "ASYNC_TEST_TIMEOUT";

/// Resolves the effective timeout for one invocation, in seconds.
///
/// An override parsing to a positive number wins unconditionally. An absent,
/// blank, or zero override means "no override", never "a timeout of zero".
/// A negative or unparsable override is a configuration error rather than a
/// silent fallback.
pub fn resolve(explicit: Option<f64>, env_override: Option<&str>) -> Result<f64, HarnessError> {
    if let Some(raw) = env_override {
        let raw = raw.trim();
        if !raw.is_empty() {
            let parsed: f64 = raw.parse().map_err(|_| {
                HarnessError::configuration(format!(
                    "{TIMEOUT_ENV_VAR} must be a number of seconds, got {raw:?}"
                ))
            })?;
            if parsed > 0.0 {
                return Ok(parsed);
            }
            if parsed != 0.0 {
                return Err(HarnessError::configuration(format!(
                    "{TIMEOUT_ENV_VAR} must be positive or \"0\", got {raw:?}"
                )));
            }
            // Exactly zero: treated as unset.
        }
    }

    match explicit {
        Some(seconds) if seconds > 0.0 => Ok(seconds),
        Some(seconds) => Err(HarnessError::configuration(format!(
            "per-test timeout must be positive, got {seconds}"
        ))),
        None => Ok(DEFAULT_TIMEOUT_SECS),
    }
}

/// Resolves against the live environment. Reads [`TIMEOUT_ENV_VAR`] afresh on
/// every call.
pub fn effective_timeout(explicit: Option<f64>) -> Result<f64, HarnessError> {
    let raw = std::env::var(TIMEOUT_ENV_VAR).ok();
    resolve(explicit, raw.as_deref())
}

/// Sets the override variable for a scope and restores the previous value on
/// drop, whatever the exit path.
#[must_use = "the previous value is restored when the guard drops"]
pub struct ScopedOverride {
    previous: Option<std::ffi::OsString>,
}

impl ScopedOverride {
    pub fn set(value: &str) -> Self {
        let previous = std::env::var_os(TIMEOUT_ENV_VAR);
        std::env::set_var(TIMEOUT_ENV_VAR, value);
        Self { previous }
    }

    /// Removes the variable for the scope.
    pub fn clear() -> Self {
        let previous = std::env::var_os(TIMEOUT_ENV_VAR);
        std::env::remove_var(TIMEOUT_ENV_VAR);
        Self { previous }
    }
}

impl Drop for ScopedOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => std::env::set_var(TIMEOUT_ENV_VAR, value),
            None => std::env::remove_var(TIMEOUT_ENV_VAR),
        }
    }
}
