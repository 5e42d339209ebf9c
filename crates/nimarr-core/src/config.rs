//! Config - Runtime Policies for Array Operations
//!
//! Arrays are single-threaded values, so the active policy is kept in a
//! thread-local and changed with RAII guards, the same way a scoped mode
//! switch is usually handled. Two behaviours are configurable:
//!
//! - what a map copy does when source and destination extents disagree
//! - what resizing a map does
//!
//! Both can also be read from the environment with [`ArrayConfig::from_env`].
//!
//! @version 0.1.0

use std::cell::Cell;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable selecting the [`MismatchPolicy`].
pub const SHAPE_MISMATCH_ENV: &str = "NIMARR_SHAPE_MISMATCH";

/// Environment variable selecting the [`MapResizePolicy`].
pub const MAP_RESIZE_ENV: &str = "NIMARR_MAP_RESIZE";

// =============================================================================
// Policies
// =============================================================================

/// Behaviour of a map copy whose operand extents disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Log the mismatch and copy nothing.
    #[default]
    Reject,
    /// Log the mismatch and copy over the destination's extents, as long as
    /// the source view still fits inside its buffer.
    Proceed,
}

impl FromStr for MismatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "proceed" => Ok(Self::Proceed),
            other => Err(Error::invalid_config(format!(
                "unknown shape mismatch policy '{other}' (expected 'reject' or 'proceed')"
            ))),
        }
    }
}

/// Behaviour of `set_size` on an array that maps another array's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapResizePolicy {
    /// Log a warning and turn the map into a freshly allocated owning array.
    /// The previously viewed buffer is left untouched.
    #[default]
    Detach,
    /// Log an error and refuse the resize.
    Forbid,
}

impl FromStr for MapResizePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detach" => Ok(Self::Detach),
            "forbid" => Ok(Self::Forbid),
            other => Err(Error::invalid_config(format!(
                "unknown map resize policy '{other}' (expected 'detach' or 'forbid')"
            ))),
        }
    }
}

// =============================================================================
// ArrayConfig
// =============================================================================

/// The full set of runtime policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayConfig {
    /// Policy for map copies with disagreeing extents.
    pub shape_mismatch: MismatchPolicy,
    /// Policy for resizing a map.
    pub map_resize: MapResizePolicy,
}

impl ArrayConfig {
    /// Returns a copy with a different shape mismatch policy.
    #[must_use]
    pub fn with_shape_mismatch(mut self, policy: MismatchPolicy) -> Self {
        self.shape_mismatch = policy;
        self
    }

    /// Returns a copy with a different map resize policy.
    #[must_use]
    pub fn with_map_resize(mut self, policy: MapResizePolicy) -> Self {
        self.map_resize = policy;
        self
    }

    /// Builds a configuration from the process environment.
    ///
    /// Unset variables keep their defaults; unparseable values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(SHAPE_MISMATCH_ENV) {
            config.shape_mismatch = value.parse()?;
        }
        if let Some(value) = lookup(MAP_RESIZE_ENV) {
            config.map_resize = value.parse()?;
        }
        debug!(?config, "array policies loaded");
        Ok(config)
    }
}

// =============================================================================
// Thread-Local State
// =============================================================================

thread_local! {
    /// Policies in effect for this thread.
    static CONFIG: Cell<ArrayConfig> = Cell::new(ArrayConfig::default());
}

/// Returns the configuration in effect on this thread.
#[must_use]
pub fn current() -> ArrayConfig {
    CONFIG.with(Cell::get)
}

/// Replaces the configuration for this thread and returns the previous one.
pub fn set(config: ArrayConfig) -> ArrayConfig {
    CONFIG.with(|c| c.replace(config))
}

/// RAII guard that installs a configuration for the rest of its scope.
///
/// The previous configuration is restored on drop, so guards nest.
///
/// # Example
/// ```rust
/// use nimarr_core::config::{self, ArrayConfig, ConfigGuard, MapResizePolicy};
///
/// {
///     let _guard = ConfigGuard::new(
///         ArrayConfig::default().with_map_resize(MapResizePolicy::Forbid),
///     );
///     assert_eq!(config::current().map_resize, MapResizePolicy::Forbid);
/// }
/// assert_eq!(config::current().map_resize, MapResizePolicy::Detach);
/// ```
#[must_use = "the configuration is reverted as soon as the guard is dropped"]
pub struct ConfigGuard {
    prev: ArrayConfig,
}

impl ConfigGuard {
    /// Installs `config` until the guard is dropped.
    pub fn new(config: ArrayConfig) -> Self {
        Self { prev: set(config) }
    }
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        set(self.prev);
    }
}

/// Runs a closure with `config` in effect.
pub fn with_config<F, R>(config: ArrayConfig, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ConfigGuard::new(config);
    f()
}

// =============================================================================
// Tests
// =============================================================================
