//! # basic-au
//!
//! Audio Unit (AUv3) layer for the Basic Audio Unit.
//!
//! This crate adapts host data to the format-agnostic render core in
//! `basic-au-core` and assembles the unit a host instantiates:
//!
//! - Audio component registration codes ([`AuConfig`], [`fourcc!`])
//! - `repr(C)` render event and buffer list layouts, and decoding of the
//!   host's event list (MIDI 1.0 and UMP event lists)
//! - OSStatus mapping for every render core error
//! - The plugin assembly ([`BasicAudioUnit`]) with its parameter and preset
//!   tables and saved state
//! - The lifetime-checked render handle ([`RenderBlock`])
//!
//! ## Architecture
//!
//! ```text
//! AU host
//!        ↓  timestamp, frame count, AURenderEvent list, AudioBufferList
//! RenderBlock (Weak, try_lock)
//!        ↓  EventList, scratch AudioBuffer
//! RenderEngine (basic-au-core)
//!        ↓  sub-block renders between event offsets
//! Mixer<generator> (basic-au-dsp)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use basic_au::{BasicAudioUnit, Variant};
//! use basic_au_core::{AudioBuffer, RenderEvent};
//!
//! let unit = BasicAudioUnit::new(Variant::Oscillator)?;
//! unit.allocate_render_resources(unit.proposed_format())?;
//!
//! let block = unit.render_block();
//! let mut output = AudioBuffer::stereo(512);
//! let status = block.render(512, &[RenderEvent::note_on(0, 60, 100, 0)], &mut output);
//! ```

pub mod audio_unit;
pub mod buffers;
pub mod config;
pub mod error;
pub mod parameters;
pub mod presets;
pub mod render_block;
pub mod render_event;
pub mod variant;

use basic_au_core::PluginConfig;

pub use audio_unit::BasicAudioUnit;
pub use buffers::{deliver_output, validate_output, AudioBufferList, StereoBufferList};
pub use config::{AuConfig, ComponentType, FourCharCode};
pub use error::{os_status, status_of, to_os_status};
pub use parameters::{
    describe_parameters, format_value, parameter_table, AUParameterUnit, ParameterDescription,
    DEFAULT_GAIN, GAIN,
};
pub use presets::FACTORY_PRESETS;
pub use render_block::RenderBlock;
pub use render_event::{
    extract_render_events, AUMIDIEvent, AUParameterEvent, AURenderEvent, AURenderEventHeader,
    AURenderEventType, AudioTimeStamp, AU_EVENT_SAMPLE_TIME_IMMEDIATE,
};
pub use variant::Variant;

/// Shared plugin metadata.
pub static CONFIG: PluginConfig = PluginConfig::new("A Basic Audio Unit")
    .with_vendor("Hwco")
    .with_version(env!("CARGO_PKG_VERSION"))
    .with_midi_input();

/// Component registration as hosts look it up.
pub static AU_CONFIG: AuConfig = AuConfig::new(
    ComponentType::MusicDevice,
    fourcc!(b"Hwco"), // Manufacturer
    fourcc!(b"abau"), // Subtype
);
