//! The plugin assembly.
//!
//! [`BasicAudioUnit`] owns the parameter registry, the shared mix level and
//! the render state, and is what a host collaborator talks to on the control
//! thread: allocate/deallocate, parameter access, presets and saved state.
//! The render thread only ever sees the [`RenderBlock`] handed out by
//! [`BasicAudioUnit::render_block`].
//!
//! # Gain
//!
//! The gain parameter reaches the signal chain two ways. A registry observer
//! writes every change into the chain's [`MixLevel`], so values set from the
//! control thread (UI, presets, restored state) take effect without a render
//! call. Gain events inside a render call additionally go through the
//! engine's mix-gain dispatch, which applies them at their sample offset.

use std::sync::{Arc, Mutex, MutexGuard};

use basic_au_core::{
    apply_preset, find_preset, EngineConfig, MidiChannel, MidiNote, ParameterAddress,
    ParameterRegistry, ParameterState, ParameterValue, PluginConfig, Preset, RenderEngine,
    RenderError, RenderFormat, RenderResult, RenderStatsSnapshot, MAX_RENDER_EVENTS,
};
use basic_au_dsp::MixLevel;

use crate::config::AuConfig;
use crate::parameters::{
    describe_parameters, parameter_table, ParameterDescription, DEFAULT_GAIN, GAIN,
};
use crate::presets::FACTORY_PRESETS;
use crate::render_block::{RenderBlock, UnitRenderState};
use crate::variant::Variant;
use crate::{AU_CONFIG, CONFIG};

/// A basic Audio Unit instance.
pub struct BasicAudioUnit {
    variant: Variant,
    au_config: AuConfig,
    engine_config: EngineConfig,
    registry: Arc<ParameterRegistry>,
    mix_level: MixLevel,
    render_state: Arc<Mutex<UnitRenderState>>,
    current_preset: Option<usize>,
}

impl BasicAudioUnit {
    /// Create a unit with the default engine configuration.
    pub fn new(variant: Variant) -> RenderResult<Self> {
        Self::with_config(variant, EngineConfig::default())
    }

    /// Create a unit.
    ///
    /// Builds the parameter registry from the unit's table and wires the
    /// gain parameter to the signal chain. No render resources are
    /// allocated until [`allocate_render_resources`](Self::allocate_render_resources).
    pub fn with_config(variant: Variant, engine_config: EngineConfig) -> RenderResult<Self> {
        let registry = Arc::new(ParameterRegistry::new(&parameter_table())?);
        let mix_level = MixLevel::new(DEFAULT_GAIN);

        let observed_level = mix_level.clone();
        registry.observe_changes(GAIN, move |value| observed_level.set(value))?;

        let engine = RenderEngine::new(
            Arc::clone(&registry),
            variant.source_factory(mix_level.clone()),
        )
        .with_config(&engine_config)
        .with_mix_gain_parameter(GAIN);

        let au_config = AU_CONFIG.with_component_type(variant.component_type());
        log::info!(
            "Created {} ({}) playing {}",
            CONFIG.name,
            au_config,
            variant
        );

        Ok(Self {
            variant,
            au_config,
            engine_config,
            registry,
            mix_level,
            render_state: Arc::new(Mutex::new(UnitRenderState::new(engine))),
            current_preset: None,
        })
    }

    /// Static plugin metadata.
    pub fn plugin_config(&self) -> &'static PluginConfig {
        &CONFIG
    }

    /// Component registration of this instance.
    pub fn au_config(&self) -> AuConfig {
        self.au_config
    }

    /// The generator this unit plays.
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// The format proposed to the host before negotiation.
    pub fn proposed_format(&self) -> RenderFormat {
        self.engine_config.format()
    }

    fn lock_state(&self) -> RenderResult<MutexGuard<'_, UnitRenderState>> {
        self.render_state
            .lock()
            .map_err(|_| RenderError::InvalidState("render state poisoned"))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Build the signal chain for `format`. Control thread only.
    ///
    /// Blocks until any in-flight render call has finished.
    pub fn allocate_render_resources(&self, format: RenderFormat) -> RenderResult<()> {
        self.lock_state()?.allocate(format)
    }

    /// Release the signal chain. Idempotent.
    pub fn deallocate_render_resources(&self) -> RenderResult<()> {
        self.lock_state()?.deallocate();
        Ok(())
    }

    /// Whether render resources are allocated.
    pub fn is_allocated(&self) -> bool {
        self.lock_state()
            .map(|state| state.engine.is_allocated())
            .unwrap_or(false)
    }

    /// The negotiated format, if allocated.
    pub fn render_format(&self) -> Option<RenderFormat> {
        self.lock_state().ok()?.engine.format()
    }

    /// Handle for the render thread.
    pub fn render_block(&self) -> RenderBlock {
        RenderBlock::new(&self.render_state)
    }

    /// Render counters.
    ///
    /// Logs a warning when host events have been dropped because a render
    /// call carried more than the event list holds.
    pub fn stats(&self) -> RenderResult<RenderStatsSnapshot> {
        let stats = self.lock_state()?.engine.stats().snapshot();
        if stats.dropped_events > 0 {
            log::warn!(
                "{} host events dropped: more than {} events in a render call",
                stats.dropped_events,
                MAX_RENDER_EVENTS
            );
        }
        Ok(stats)
    }

    /// Whether the signal chain is sounding `note`.
    pub fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.lock_state()
            .map(|state| state.engine.is_note_active(note, channel))
            .unwrap_or(false)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// The unit's parameter registry.
    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    /// Current value of a parameter.
    pub fn parameter(&self, address: ParameterAddress) -> RenderResult<ParameterValue> {
        self.registry.get(address)
    }

    /// Set a parameter from the control thread. Returns the stored value.
    pub fn set_parameter(
        &self,
        address: ParameterAddress,
        value: ParameterValue,
    ) -> RenderResult<ParameterValue> {
        self.registry.set(address, value)
    }

    /// Descriptions for the host's parameter tree.
    pub fn parameter_tree(&self) -> Vec<ParameterDescription> {
        describe_parameters(&self.registry)
    }

    /// Gain the signal chain currently applies.
    pub fn mix_level(&self) -> f32 {
        self.mix_level.get()
    }

    // =========================================================================
    // Presets and state
    // =========================================================================

    /// Presets offered to the host.
    pub fn factory_presets(&self) -> &'static [Preset] {
        &FACTORY_PRESETS
    }

    /// The last preset applied, unless parameters were restored since.
    pub fn current_preset(&self) -> Option<&'static Preset> {
        self.current_preset
            .and_then(|index| find_preset(&FACTORY_PRESETS, index).ok())
    }

    /// Apply a factory preset. Unknown indices change nothing.
    pub fn set_current_preset(&mut self, index: usize) -> RenderResult<()> {
        let preset = apply_preset(&self.registry, &FACTORY_PRESETS, index)?;
        self.current_preset = Some(preset.index);
        Ok(())
    }

    /// Serialize every parameter value for the host's saved state.
    pub fn full_state(&self) -> RenderResult<String> {
        self.registry.snapshot().to_json()
    }

    /// Restore parameter values saved by [`full_state`](Self::full_state).
    ///
    /// Unknown addresses are skipped. Returns the number of values applied.
    pub fn set_full_state(&mut self, json: &str) -> RenderResult<usize> {
        let state = ParameterState::from_json(json)?;
        let applied = self.registry.restore(&state);
        self.current_preset = None;
        log::info!("Restored {} parameter value(s)", applied);
        Ok(applied)
    }
}

impl Drop for BasicAudioUnit {
    fn drop(&mut self) {
        if let Ok(mut state) = self.render_state.lock() {
            state.deallocate();
        }
    }
}

impl std::fmt::Debug for BasicAudioUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAudioUnit")
            .field("variant", &self.variant)
            .field("au_config", &self.au_config)
            .field("registry", &self.registry)
            .field("current_preset", &self.current_preset)
            .finish_non_exhaustive()
    }
}
