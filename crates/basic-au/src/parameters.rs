//! Parameter table and host-facing parameter descriptions.
//!
//! The unit exposes a fixed, address-keyed table loaded once at
//! construction. Hosts build their parameter tree from
//! [`describe_parameters`]; units are reported as `AudioUnitParameterUnit`
//! codes so the host can scale and label values.

use basic_au_core::{
    ParameterAddress, ParameterInfo, ParameterRegistry, ParameterUnit, ParameterValue,
};

/// Address of the output gain.
pub const GAIN: ParameterAddress = 0;

/// Gain before any host or preset change.
pub const DEFAULT_GAIN: ParameterValue = 0.25;

/// The unit's parameter table.
pub fn parameter_table() -> [ParameterInfo; 1] {
    [ParameterInfo::new(GAIN, "gain", "Gain")
        .with_range(0.0, 1.0)
        .with_default(DEFAULT_GAIN)
        .with_unit(ParameterUnit::LinearGain)]
}

/// AU parameter unit types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AUParameterUnit {
    Generic = 0,
    Percent = 3,
    Hertz = 8,
    Decibels = 13,
    LinearGain = 14,
    Milliseconds = 24,
}

impl From<ParameterUnit> for AUParameterUnit {
    fn from(unit: ParameterUnit) -> Self {
        match unit {
            ParameterUnit::Generic => Self::Generic,
            ParameterUnit::LinearGain => Self::LinearGain,
            ParameterUnit::Decibels => Self::Decibels,
            ParameterUnit::Hertz => Self::Hertz,
            ParameterUnit::Percent => Self::Percent,
            ParameterUnit::Milliseconds => Self::Milliseconds,
        }
    }
}

/// One node of the host's parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescription {
    pub address: ParameterAddress,
    pub identifier: &'static str,
    pub name: &'static str,
    pub unit: AUParameterUnit,
    pub unit_label: &'static str,
    pub min: ParameterValue,
    pub max: ParameterValue,
    pub default: ParameterValue,
    /// Current value, read lock-free from the registry.
    pub value: ParameterValue,
}

/// Describe every registered parameter, in address order.
pub fn describe_parameters(registry: &ParameterRegistry) -> Vec<ParameterDescription> {
    registry
        .infos()
        .map(|info| ParameterDescription {
            address: info.address,
            identifier: info.identifier,
            name: info.name,
            unit: info.unit.into(),
            unit_label: info.unit.label(),
            min: info.min,
            max: info.max,
            default: info.default,
            value: registry.get(info.address).unwrap_or(info.default),
        })
        .collect()
}

/// Display string for a parameter value, as shown in a generic host view.
pub fn format_value(info: &ParameterInfo, value: ParameterValue) -> String {
    let label = info.unit.label();
    if label.is_empty() {
        format!("{:.2}", value)
    } else {
        format!("{:.2} {}", value, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_table() {
        let registry = ParameterRegistry::new(&parameter_table()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(GAIN).unwrap(), DEFAULT_GAIN);
        assert_eq!(registry.set(GAIN, 1.5).unwrap(), 1.0);
    }

    #[test]
    fn test_describe_parameters() {
        let registry = ParameterRegistry::new(&parameter_table()).unwrap();
        registry.set(GAIN, 0.5).unwrap();

        let tree = describe_parameters(&registry);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].identifier, "gain");
        assert_eq!(tree[0].unit, AUParameterUnit::LinearGain);
        assert_eq!(tree[0].unit as u32, 14);
        assert_eq!(tree[0].default, DEFAULT_GAIN);
        assert_eq!(tree[0].value, 0.5);
    }

    #[test]
    fn test_format_value() {
        let table = parameter_table();
        let cutoff = ParameterInfo::new(9, "cutoff", "Cutoff")
            .with_range(20.0, 20_000.0)
            .with_unit(ParameterUnit::Hertz);
        assert_eq!(format_value(&cutoff, 440.0), "440.00 Hz");
        assert_eq!(format_value(&table[0], 0.25), "0.25");
    }
}
