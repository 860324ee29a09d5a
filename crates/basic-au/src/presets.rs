//! Factory presets.

use basic_au_core::Preset;

use crate::parameters::GAIN;

/// Presets offered to the host, in index order.
pub static FACTORY_PRESETS: [Preset; 3] = [
    Preset::new(0, "Default", &[(GAIN, 0.25)]),
    Preset::new(1, "Quiet", &[(GAIN, 0.1)]),
    Preset::new(2, "Full", &[(GAIN, 1.0)]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{parameter_table, DEFAULT_GAIN};
    use basic_au_core::{apply_preset, ParameterRegistry, RenderError};

    #[test]
    fn test_presets_apply_to_gain_table() {
        let registry = ParameterRegistry::new(&parameter_table()).unwrap();
        for preset in &FACTORY_PRESETS {
            apply_preset(&registry, &FACTORY_PRESETS, preset.index).unwrap();
            assert_eq!(registry.get(GAIN).unwrap(), preset.values[0].1);
        }
    }

    #[test]
    fn test_default_preset_matches_default_gain() {
        assert_eq!(FACTORY_PRESETS[0].values, &[(GAIN, DEFAULT_GAIN)]);
    }

    #[test]
    fn test_unknown_index() {
        let registry = ParameterRegistry::new(&parameter_table()).unwrap();
        assert_eq!(
            apply_preset(&registry, &FACTORY_PRESETS, 3),
            Err(RenderError::UnknownPreset(3))
        );
    }
}
