//! Polyphonic sine instrument.
//!
//! Eight sine voices keyed by `(note, channel)`. A note-off silences its
//! voice from the next rendered frame; there is no release stage. When every
//! voice is busy the oldest one is stolen.

use basic_au_core::{
    cc, note_to_frequency, pitch_bend_to_bipolar, MidiChannel, MidiNote, RenderFormat,
    RenderResult, RenderSlice, SignalSource, SourceError,
};

use crate::oscillator::SineOscillator;

/// Number of simultaneous voices.
pub const MAX_VOICES: usize = 8;

/// Pitch bend range in semitones each way.
pub const PITCH_BEND_RANGE: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
struct Voice {
    oscillator: SineOscillator,
    note: MidiNote,
    channel: MidiChannel,
    amplitude: f32,
    started: u64,
    active: bool,
}

impl Voice {
    fn idle(sample_rate: f64) -> Self {
        Self {
            oscillator: SineOscillator::new(sample_rate),
            note: 0,
            channel: 0,
            amplitude: 0.0,
            started: 0,
            active: false,
        }
    }

    fn retune(&mut self, bend_semitones: f64) {
        let frequency = note_to_frequency(self.note) * (bend_semitones / 12.0).exp2();
        self.oscillator.set_frequency(frequency);
    }
}

/// Sine voices driven by MIDI.
#[derive(Debug)]
pub struct OscillatorInstrument {
    voices: Vec<Voice>,
    bend_semitones: f64,
    volume: f32,
    note_counter: u64,
    running: bool,
}

impl OscillatorInstrument {
    /// Create an instrument. Voices are allocated by `prepare`.
    pub fn new() -> Self {
        Self {
            voices: Vec::new(),
            bend_semitones: 0.0,
            volume: 1.0,
            note_counter: 0,
            running: false,
        }
    }

    /// Number of sounding voices.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Channel volume set by CC 7, 0.0 to 1.0.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            voice.active = false;
        }
    }

    fn allocate_voice(&mut self, note: MidiNote, channel: MidiChannel) -> Option<usize> {
        if let Some(index) = self
            .voices
            .iter()
            .position(|v| v.active && v.note == note && v.channel == channel)
        {
            return Some(index);
        }
        if let Some(index) = self.voices.iter().position(|v| !v.active) {
            return Some(index);
        }
        // Steal the oldest voice.
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.started)
            .map(|(index, _)| index)
    }
}

impl Default for OscillatorInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for OscillatorInstrument {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        self.voices = vec![Voice::idle(format.sample_rate); MAX_VOICES];
        self.note_counter = 0;
        log::debug!(
            "Oscillator instrument prepared: {} voices at {} Hz",
            MAX_VOICES,
            format.sample_rate
        );
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.all_notes_off();
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

        let volume = self.volume;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            let gain = voice.amplitude * volume;
            for frame in 0..output.len() {
                let sample = voice.oscillator.process() as f32 * gain;
                output.add_frame(frame, sample, sample);
            }
        }
        Ok(())
    }

    fn note_on(&mut self, note: MidiNote, velocity: u8, channel: MidiChannel) {
        let Some(index) = self.allocate_voice(note, channel) else {
            return;
        };
        self.note_counter += 1;
        let bend = self.bend_semitones;
        let voice = &mut self.voices[index];
        voice.note = note;
        voice.channel = channel;
        voice.amplitude = velocity.min(127) as f32 / 127.0;
        voice.started = self.note_counter;
        voice.active = true;
        voice.oscillator.reset();
        voice.retune(bend);
    }

    fn note_off(&mut self, note: MidiNote, channel: MidiChannel) {
        for voice in &mut self.voices {
            if voice.active && voice.note == note && voice.channel == channel {
                voice.active = false;
            }
        }
    }

    fn control_change(&mut self, controller: u8, value: u8, _channel: MidiChannel) {
        match controller {
            cc::VOLUME => self.volume = value.min(127) as f32 / 127.0,
            cc::ALL_NOTES_OFF | cc::ALL_SOUND_OFF => self.all_notes_off(),
            _ => {}
        }
    }

    fn pitch_bend(&mut self, amount: u16, _channel: MidiChannel) {
        self.bend_semitones = pitch_bend_to_bipolar(amount) as f64 * PITCH_BEND_RANGE;
        let bend = self.bend_semitones;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            voice.retune(bend);
        }
    }

    fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.voices
            .iter()
            .any(|v| v.active && v.note == note && v.channel == channel)
    }
}
