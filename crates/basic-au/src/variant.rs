//! Generator selection.
//!
//! A [`Variant`] decides which signal chain the unit builds when the host
//! allocates render resources. Every chain ends in a [`Mixer`] reading the
//! unit's shared [`MixLevel`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use basic_au_core::{note_to_frequency, RenderFormat, RenderResult, SignalSource, SourceFactory};
use basic_au_dsp::{
    AudioClip, LoopPlayer, MixLevel, Mixer, OscillatorInstrument, Reverb, Sampler, ROOT_NOTE,
};

use crate::config::ComponentType;

/// Length of the synthesized sampler clip.
const PLUCK_SECONDS: f64 = 1.0;

/// Which generator the unit plays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Variant {
    /// Polyphonic sine instrument.
    #[default]
    Oscillator,
    /// Re-pitched pluck per note.
    Sampler,
    /// Looping WAV file, optionally through a reverb.
    FilePlayer { path: PathBuf, reverb: bool },
}

impl Variant {
    /// Parse a variant name as given on a command line.
    ///
    /// `file` requires `path`; `file+reverb` adds the reverb.
    pub fn parse(name: &str, path: Option<PathBuf>) -> Option<Self> {
        match (name, path) {
            ("oscillator" | "osc", _) => Some(Self::Oscillator),
            ("sampler", _) => Some(Self::Sampler),
            ("file", Some(path)) => Some(Self::FilePlayer {
                path,
                reverb: false,
            }),
            ("file+reverb", Some(path)) => Some(Self::FilePlayer { path, reverb: true }),
            _ => None,
        }
    }

    /// Component type hosts register this variant under.
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Oscillator | Self::Sampler => ComponentType::MusicDevice,
            Self::FilePlayer { .. } => ComponentType::Generator,
        }
    }

    /// Build the factory the engine calls on every allocation.
    ///
    /// File decoding happens inside the factory, on the control thread.
    pub fn source_factory(&self, level: MixLevel) -> SourceFactory {
        let variant = self.clone();
        Box::new(move |format: &RenderFormat| variant.build(format, level.clone()))
    }

    fn build(
        &self,
        format: &RenderFormat,
        level: MixLevel,
    ) -> RenderResult<Box<dyn SignalSource>> {
        let source: Box<dyn SignalSource> = match self {
            Self::Oscillator => Box::new(Mixer::new(OscillatorInstrument::new(), level)),
            Self::Sampler => {
                let clip = AudioClip::pluck(
                    note_to_frequency(ROOT_NOTE),
                    PLUCK_SECONDS,
                    format.sample_rate,
                )?;
                Box::new(Mixer::new(Sampler::new(Arc::new(clip)), level))
            }
            Self::FilePlayer { path, reverb } => {
                let player = LoopPlayer::open(path)?;
                if *reverb {
                    Box::new(Mixer::new(Reverb::new(player), level))
                } else {
                    Box::new(Mixer::new(player, level))
                }
            }
        };
        log::debug!("Built {} source for {:?}", self, format);
        Ok(source)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oscillator => f.write_str("oscillator"),
            Self::Sampler => f.write_str("sampler"),
            Self::FilePlayer {
                path,
                reverb: false,
            } => write!(f, "file player ({})", path.display()),
            Self::FilePlayer { path, reverb: true } => {
                write!(f, "file player with reverb ({})", path.display())
            }
        }
    }
}
