//! Factory presets.
//!
//! A preset is a named list of `(address, value)` pairs. Applying one is a
//! bulk [`ParameterRegistry::set`] on the control thread; observers fire for
//! every value, so the signal chain follows without a render call.

use crate::error::{RenderError, RenderResult};
use crate::parameters::ParameterRegistry;
use crate::types::{ParameterAddress, ParameterValue};

/// One entry of a fixed preset table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Position in the table, as reported to the host.
    pub index: usize,
    /// Display name.
    pub name: &'static str,
    /// Values to apply.
    pub values: &'static [(ParameterAddress, ParameterValue)],
}

impl Preset {
    /// Create a preset.
    pub const fn new(
        index: usize,
        name: &'static str,
        values: &'static [(ParameterAddress, ParameterValue)],
    ) -> Self {
        Self {
            index,
            name,
            values,
        }
    }
}

/// Look up a preset by its index.
pub fn find_preset(presets: &[Preset], index: usize) -> RenderResult<&Preset> {
    presets
        .iter()
        .find(|preset| preset.index == index)
        .ok_or(RenderError::UnknownPreset(index))
}

/// Apply the preset at `index` to `registry`.
///
/// Every address is checked before anything is written, so a preset naming
/// an unknown parameter changes nothing.
pub fn apply_preset<'p>(
    registry: &ParameterRegistry,
    presets: &'p [Preset],
    index: usize,
) -> RenderResult<&'p Preset> {
    let preset = find_preset(presets, index)?;
    if let Some(&(address, _)) = preset
        .values
        .iter()
        .find(|(address, _)| !registry.contains(*address))
    {
        return Err(RenderError::InvalidParameterAddress(address));
    }
    for &(address, value) in preset.values {
        registry.set(address, value)?;
    }
    log::info!("Applied preset {} ({})", preset.index, preset.name);
    Ok(preset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_info::ParameterInfo;

    const PRESETS: &[Preset] = &[
        Preset::new(0, "Default", &[(0, 0.25)]),
        Preset::new(1, "Loud", &[(0, 3.0)]),
        Preset::new(2, "Broken", &[(0, 0.5), (9, 1.0)]),
    ];

    fn registry() -> ParameterRegistry {
        ParameterRegistry::new(&[ParameterInfo::new(0, "gain", "Gain").with_default(0.25)])
            .unwrap()
    }

    #[test]
    fn test_apply_clamps() {
        let registry = registry();
        let preset = apply_preset(&registry, PRESETS, 1).unwrap();
        assert_eq!(preset.name, "Loud");
        assert_eq!(registry.get(0).unwrap(), 1.0);
    }

    #[test]
    fn test_unknown_index() {
        let registry = registry();
        assert!(matches!(
            apply_preset(&registry, PRESETS, 7),
            Err(RenderError::UnknownPreset(7))
        ));
    }

    #[test]
    fn test_invalid_address_changes_nothing() {
        let registry = registry();
        assert!(matches!(
            apply_preset(&registry, PRESETS, 2),
            Err(RenderError::InvalidParameterAddress(9))
        ));
        assert_eq!(registry.get(0).unwrap(), 0.25);
    }
}
