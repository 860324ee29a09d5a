//! # basic-au-dsp
//!
//! Signal sources for the Basic Audio Unit.
//!
//! Every type here implements [`basic_au_core::SignalSource`]. Generators
//! ([`OscillatorInstrument`], [`Sampler`], [`LoopPlayer`]) produce audio;
//! wrappers ([`Reverb`], [`Mixer`]) take another source and process its
//! output in place. A typical chain is `Mixer<Reverb<LoopPlayer>>` or
//! `Mixer<OscillatorInstrument>`.
//!
//! Everything that allocates (voice tables, delay lines, decoded clips)
//! does so in `prepare` or at construction on the control thread.

pub mod clip;
pub mod error;
pub mod instrument;
pub mod mixer;
pub mod oscillator;
pub mod player;
pub mod reverb;
pub mod sampler;

pub use clip::AudioClip;
pub use error::{DspError, DspResult};
pub use instrument::{OscillatorInstrument, MAX_VOICES, PITCH_BEND_RANGE};
pub use mixer::{MixLevel, Mixer, INITIAL_MIX_LEVEL};
pub use oscillator::SineOscillator;
pub use player::LoopPlayer;
pub use reverb::Reverb;
pub use sampler::{Sampler, SamplerMode, ROOT_NOTE, SAMPLER_VOICES};
