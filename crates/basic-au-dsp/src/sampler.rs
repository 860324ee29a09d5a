//! Pitched sample playback.
//!
//! Every note plays the same [`AudioClip`], re-pitched relative to
//! [`ROOT_NOTE`]. In [`SamplerMode::Held`] a note-off stops the voice; in
//! [`SamplerMode::OneShot`] the clip always plays to its end.

use std::sync::Arc;

use basic_au_core::{
    cc, MidiChannel, MidiNote, RenderFormat, RenderResult, RenderSlice, SignalSource, SourceError,
};

use crate::clip::AudioClip;

/// Note that plays the clip at its recorded pitch.
pub const ROOT_NOTE: MidiNote = 60;

/// Simultaneous sampler voices.
pub const SAMPLER_VOICES: usize = 8;

/// How note-off affects a sounding voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerMode {
    /// Note-off stops the voice.
    #[default]
    Held,
    /// Voices run to the end of the clip; note-off is ignored.
    OneShot,
}

#[derive(Debug, Clone, Copy, Default)]
struct SamplerVoice {
    note: MidiNote,
    channel: MidiChannel,
    position: f64,
    step: f64,
    amplitude: f32,
    started: u64,
    active: bool,
}

/// Plays a clip per note.
#[derive(Debug)]
pub struct Sampler {
    clip: Arc<AudioClip>,
    mode: SamplerMode,
    voices: Vec<SamplerVoice>,
    rate_ratio: f64,
    note_counter: u64,
    running: bool,
}

impl Sampler {
    /// Create a sampler playing `clip`.
    pub fn new(clip: Arc<AudioClip>) -> Self {
        Self {
            clip,
            mode: SamplerMode::default(),
            voices: Vec::new(),
            rate_ratio: 1.0,
            note_counter: 0,
            running: false,
        }
    }

    /// Set the note-off behaviour.
    pub fn with_mode(mut self, mode: SamplerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of sounding voices.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }
}

impl SignalSource for Sampler {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        self.voices = vec![SamplerVoice::default(); SAMPLER_VOICES];
        self.rate_ratio = self.clip.sample_rate() / format.sample_rate;
        self.note_counter = 0;
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        for voice in &mut self.voices {
            voice.active = false;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
        if self.voices.is_empty() {
            return Err(SourceError::NotPrepared);
        }
        output.clear();
        if !self.running {
            return Ok(());
        }

        let clip = &*self.clip;
        let end = clip.len() as f64;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            for frame in 0..output.len() {
                if voice.position >= end {
                    voice.active = false;
                    break;
                }
                let (left, right) = clip.frame_at(voice.position);
                output.add_frame(frame, left * voice.amplitude, right * voice.amplitude);
                voice.position += voice.step;
            }
        }
        Ok(())
    }

    fn note_on(&mut self, note: MidiNote, velocity: u8, channel: MidiChannel) {
        let index = self
            .voices
            .iter()
            .position(|v| !v.active)
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.started)
                    .map(|(index, _)| index)
            });
        let Some(index) = index else {
            return;
        };
        self.note_counter += 1;
        let semitones = note as f64 - ROOT_NOTE as f64;
        self.voices[index] = SamplerVoice {
            note,
            channel,
            position: 0.0,
            step: (semitones / 12.0).exp2() * self.rate_ratio,
            amplitude: velocity.min(127) as f32 / 127.0,
            started: self.note_counter,
            active: true,
        };
    }

    fn note_off(&mut self, note: MidiNote, channel: MidiChannel) {
        if self.mode == SamplerMode::OneShot {
            return;
        }
        for voice in &mut self.voices {
            if voice.active && voice.note == note && voice.channel == channel {
                voice.active = false;
            }
        }
    }

    fn control_change(&mut self, controller: u8, _value: u8, _channel: MidiChannel) {
        if controller == cc::ALL_NOTES_OFF || controller == cc::ALL_SOUND_OFF {
            for voice in &mut self.voices {
                voice.active = false;
            }
        }
    }

    fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.voices
            .iter()
            .any(|v| v.active && v.note == note && v.channel == channel)
    }
}
