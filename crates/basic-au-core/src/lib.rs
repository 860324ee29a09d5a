//! # basic-au-core
//!
//! Format-agnostic render core for a basic Audio Unit.
//!
//! This crate holds everything that runs between the host's render call and
//! the DSP: the parameter registry, the per-call event list and the walker
//! that dispatches it, the signal source contract, and the render engine with
//! its allocate/deallocate lifecycle. It knows nothing about Audio Unit ABI
//! types; the `basic-au` crate adapts host data to these types.
//!
//! ## Main Types
//!
//! - [`RenderEngine`] - Render entry point and lifecycle owner
//! - [`SignalSource`] - Contract for the DSP node the engine drives
//! - [`ParameterRegistry`] - Address-keyed, clamped, lock-free parameter values
//! - [`EventWalker`] - Single-pass dispatcher over a call's [`RenderEvent`]s
//! - [`EventList`] - Pre-allocated event storage filled by the format layer
//! - [`AudioBuffer`] / [`RenderSlice`] - Caller-owned output and sub-block views
//! - [`RenderError`] - Error kinds reported by every operation
//!
//! ## Threading
//!
//! `allocate`, `deallocate`, preset application and state restore run on the
//! control thread. `render` runs on the real-time thread and never allocates,
//! blocks or logs.

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod lifecycle;
pub mod midi;
pub mod parameter_info;
pub mod parameters;
pub mod preset;
pub mod source;
pub mod types;
pub mod walker;

// Re-exports for convenience
pub use buffer::{AudioBuffer, RenderSlice};
pub use config::{EngineConfig, PluginConfig, SchedulingMode};
pub use engine::{RenderEngine, RenderStats, RenderStatsSnapshot};
pub use error::{FormatError, RenderError, RenderResult, SourceError};
pub use events::{EventList, RenderEvent, RenderEventKind, MAX_RENDER_EVENTS};
pub use format::RenderFormat;
pub use lifecycle::{initialize_parameters, EngineState, LifecycleManager, RenderResources};
pub use midi::{
    cc, note_to_frequency, pitch_bend_to_bipolar, Midi1Status, MidiChannel, MidiMessage, MidiNote,
    PITCH_BEND_CENTER,
};
pub use parameter_info::{ParameterInfo, ParameterUnit};
pub use parameters::{ChangeObserver, ParameterRegistry, ParameterState};
pub use preset::{apply_preset, find_preset, Preset};
pub use source::{SignalSource, SilentSource, SourceFactory};
pub use types::{
    ParameterAddress, ParameterValue, SampleOffset, CHANNEL_COUNT, DEFAULT_MAX_FRAMES,
    DEFAULT_SAMPLE_RATE, MAX_FRAMES_LIMIT,
};
pub use walker::{dispatch, Dispatch, DispatchTarget, EventWalker, WalkReport};
