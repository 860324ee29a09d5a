//! Parameter metadata types.
//!
//! This module provides types for describing parameter metadata:
//! - [`ParameterInfo`] - one row of the fixed parameter table (address, name, range, default)
//! - [`ParameterUnit`] - how a host should label the value

use crate::types::{ParameterAddress, ParameterValue};

/// Unit a host uses to label a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterUnit {
    /// Plain number without unit.
    #[default]
    Generic,
    /// Linear gain factor (0.0 = silence, 1.0 = unity).
    LinearGain,
    /// Decibels.
    Decibels,
    /// Frequency in Hz.
    Hertz,
    /// Percentage.
    Percent,
    /// Milliseconds.
    Milliseconds,
}

impl ParameterUnit {
    /// Short label for display.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Generic | Self::LinearGain => "",
            Self::Decibels => "dB",
            Self::Hertz => "Hz",
            Self::Percent => "%",
            Self::Milliseconds => "ms",
        }
    }
}

/// Metadata describing a single parameter.
///
/// Tables of these are declared `const` and handed to
/// [`ParameterRegistry::new`](crate::ParameterRegistry::new) once at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterInfo {
    /// Stable address the host uses for automation.
    pub address: ParameterAddress,
    /// Stable identifier string (used in saved state).
    pub identifier: &'static str,
    /// Display name (e.g., "Gain").
    pub name: &'static str,
    /// Unit label hint.
    pub unit: ParameterUnit,
    /// Lowest accepted value.
    pub min: ParameterValue,
    /// Highest accepted value.
    pub max: ParameterValue,
    /// Value at construction and after reset.
    pub default: ParameterValue,
}

impl ParameterInfo {
    /// Create a parameter with range 0.0 to 1.0 and default 0.0.
    pub const fn new(address: ParameterAddress, identifier: &'static str, name: &'static str) -> Self {
        Self {
            address,
            identifier,
            name,
            unit: ParameterUnit::Generic,
            min: 0.0,
            max: 1.0,
            default: 0.0,
        }
    }

    /// Set the value range.
    pub const fn with_range(mut self, min: ParameterValue, max: ParameterValue) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the default value.
    pub const fn with_default(mut self, default: ParameterValue) -> Self {
        self.default = default;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: ParameterUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Clamp `value` into `[min, max]`.
    ///
    /// NaN maps to `min` so a stored value is always inside the range.
    #[inline]
    pub fn clamp(&self, value: ParameterValue) -> ParameterValue {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Whether the range is well formed and contains the default.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min <= self.max
            && self.default >= self.min
            && self.default <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAIN: ParameterInfo = ParameterInfo::new(0, "gain", "Gain")
        .with_range(0.0, 1.0)
        .with_default(0.25)
        .with_unit(ParameterUnit::LinearGain);

    #[test]
    fn test_builder() {
        assert_eq!(GAIN.address, 0);
        assert_eq!(GAIN.default, 0.25);
        assert_eq!(GAIN.unit, ParameterUnit::LinearGain);
        assert!(GAIN.is_valid());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(GAIN.clamp(2.0), 1.0);
        assert_eq!(GAIN.clamp(-0.5), 0.0);
        assert_eq!(GAIN.clamp(0.5), 0.5);
        assert_eq!(GAIN.clamp(f32::NAN), 0.0);
        assert_eq!(GAIN.clamp(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_invalid_default() {
        let info = ParameterInfo::new(1, "x", "X").with_range(0.0, 1.0).with_default(2.0);
        assert!(!info.is_valid());
    }
}
