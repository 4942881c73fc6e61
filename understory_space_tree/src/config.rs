// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree configuration and validation errors.

use core::fmt;

/// Structural parameters of a [`SpaceTree`][crate::SpaceTree].
///
/// Validated when the tree is constructed; see [`ConfigError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpaceTreeConfig {
    /// Number of items a leaf holds before it subdivides (the bin size).
    pub capacity: usize,
    /// Number of children per branch. Must match the geometry's fan-out.
    pub fan_out: usize,
    /// Depth at which leaves stop subdividing and accept items over capacity.
    ///
    /// The root is at depth 0. This bounds the cascade of subdivisions caused
    /// by coincident or near-coincident items.
    pub max_depth: u16,
}

impl Default for SpaceTreeConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            fan_out: 4,
            max_depth: 32,
        }
    }
}

impl SpaceTreeConfig {
    /// Default configuration with the given leaf capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the number of children per branch.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Set the maximum subdivision depth.
    pub fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn validate(&self, geometry_fan_out: usize) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.fan_out < 2 {
            return Err(ConfigError::FanOutTooSmall(self.fan_out));
        }
        if self.fan_out != geometry_fan_out {
            return Err(ConfigError::FanOutMismatch {
                configured: self.fan_out,
                geometry: geometry_fan_out,
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        Ok(())
    }
}

/// Rejected tree configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Leaves must be able to hold at least one item.
    ZeroCapacity,
    /// Branches need at least two children to partition anything.
    FanOutTooSmall(usize),
    /// The configured fan-out differs from the geometry's partition count.
    FanOutMismatch {
        /// Fan-out requested in [`SpaceTreeConfig`].
        configured: usize,
        /// Fan-out reported by the geometry.
        geometry: usize,
    },
    /// The root could never subdivide.
    ZeroMaxDepth,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => f.write_str("leaf capacity must be at least 1"),
            Self::FanOutTooSmall(n) => write!(f, "fan-out must be at least 2, got {n}"),
            Self::FanOutMismatch {
                configured,
                geometry,
            } => write!(
                f,
                "configured fan-out {configured} does not match geometry fan-out {geometry}"
            ),
            Self::ZeroMaxDepth => f.write_str("max depth must be at least 1"),
        }
    }
}

impl core::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SpaceTreeConfig};
    use alloc::string::ToString;

    #[test]
    fn validation_rejects_each_bad_field() {
        assert_eq!(SpaceTreeConfig::new(4).validate(4), Ok(()));
        assert_eq!(
            SpaceTreeConfig::new(0).validate(4),
            Err(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            SpaceTreeConfig::new(4).with_fan_out(1).validate(1),
            Err(ConfigError::FanOutTooSmall(1))
        );
        assert_eq!(
            SpaceTreeConfig::new(4).with_fan_out(8).validate(4),
            Err(ConfigError::FanOutMismatch {
                configured: 8,
                geometry: 4
            })
        );
        assert_eq!(
            SpaceTreeConfig::new(4).with_max_depth(0).validate(4),
            Err(ConfigError::ZeroMaxDepth)
        );
    }

    #[test]
    fn errors_render_readable_messages() {
        let msg = ConfigError::FanOutMismatch {
            configured: 8,
            geometry: 4,
        }
        .to_string();
        assert_eq!(msg, "configured fan-out 8 does not match geometry fan-out 4");
    }
}
