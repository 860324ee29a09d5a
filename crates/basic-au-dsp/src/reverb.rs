//! Freeverb-style reverb wrapping another source.
//!
//! Each channel runs four parallel damped comb filters into two series
//! all-pass filters. Delay lengths are tuned for 44.1 kHz and scaled to the
//! render rate in `prepare`, which is also where every delay line is
//! allocated.

use basic_au_core::{
    MidiChannel, MidiNote, RenderFormat, RenderResult, RenderSlice, SignalSource, SourceError,
};

const COMB_LENGTHS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_LENGTHS: [usize; 2] = [556, 441];
/// Extra delay on the right channel for stereo spread.
const STEREO_SPREAD: usize = 23;

#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp: f32,
    filter_store: f32,
}

impl CombFilter {
    fn new(length: usize, feedback: f32, damp: f32) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
            feedback: feedback.clamp(0.0, 0.99),
            damp: damp.clamp(0.0, 0.99),
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - self.damp) + self.filter_store * self.damp;
        self.buffer[self.index] = input + self.filter_store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct AllPassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllPassFilter {
    const FEEDBACK: f32 = 0.5;

    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        let output = -input + delayed;
        self.buffer[self.index] = input + delayed * Self::FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct ReverbChannel {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllPassFilter>,
}

impl ReverbChannel {
    fn new(sample_rate: f64, spread: usize, room: f32, damp: f32) -> Self {
        let scale = (sample_rate / 44_100.0).max(0.25);
        let scaled = |length: usize| ((length + spread) as f64 * scale).round() as usize;
        Self {
            combs: COMB_LENGTHS
                .iter()
                .map(|&length| CombFilter::new(scaled(length), 0.7 + room * 0.28, damp))
                .collect(),
            allpasses: ALLPASS_LENGTHS
                .iter()
                .map(|&length| AllPassFilter::new(scaled(length)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut sum = 0.0;
        for comb in &mut self.combs {
            sum += comb.process(input);
        }
        for allpass in &mut self.allpasses {
            sum = allpass.process(sum);
        }
        sum / self.combs.len() as f32
    }
}

/// Reverb applied to the output of an inner source.
#[derive(Debug)]
pub struct Reverb<S> {
    inner: S,
    room: f32,
    damp: f32,
    dry_wet_mix: f32,
    channels: Vec<ReverbChannel>,
}

impl<S: SignalSource> Reverb<S> {
    /// Wrap `inner` with a half-wet medium room.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            room: 0.5,
            damp: 0.5,
            dry_wet_mix: 0.5,
            channels: Vec::new(),
        }
    }

    /// Room size, 0.0 to 1.0. Applied at the next `prepare`.
    pub fn with_room(mut self, room: f32) -> Self {
        self.room = room.clamp(0.0, 1.0);
        self
    }

    /// High-frequency damping, 0.0 to 1.0. Applied at the next `prepare`.
    pub fn with_damping(mut self, damp: f32) -> Self {
        self.damp = damp.clamp(0.0, 1.0);
        self
    }

    /// Balance between dry (0.0) and wet (1.0) signal.
    pub fn with_dry_wet_mix(mut self, mix: f32) -> Self {
        self.dry_wet_mix = mix.clamp(0.0, 1.0);
        self
    }

    /// Current dry/wet balance.
    pub fn dry_wet_mix(&self) -> f32 {
        self.dry_wet_mix
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SignalSource> SignalSource for Reverb<S> {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        self.inner.prepare(format)?;
        self.channels = vec![
            ReverbChannel::new(format.sample_rate, 0, self.room, self.damp),
            ReverbChannel::new(format.sample_rate, STEREO_SPREAD, self.room, self.damp),
        ];
        Ok(())
    }

    fn start(&mut self) {
        self.inner.start();
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
        if self.channels.len() != 2 {
            return Err(SourceError::NotPrepared);
        }
        self.inner.render(output)?;

        let wet = self.dry_wet_mix;
        let dry = 1.0 - wet;
        let (left, right) = output.stereo_mut();
        for (channel, samples) in self.channels.iter_mut().zip([left, right]) {
            for sample in samples.iter_mut() {
                let input = *sample;
                *sample = input * dry + channel.process(input) * wet;
            }
        }
        Ok(())
    }

    fn note_on(&mut self, note: MidiNote, velocity: u8, channel: MidiChannel) {
        self.inner.note_on(note, velocity, channel);
    }

    fn note_off(&mut self, note: MidiNote, channel: MidiChannel) {
        self.inner.note_off(note, channel);
    }

    fn control_change(&mut self, controller: u8, value: u8, channel: MidiChannel) {
        self.inner.control_change(controller, value, channel);
    }

    fn pitch_bend(&mut self, amount: u16, channel: MidiChannel) {
        self.inner.pitch_bend(amount, channel);
    }

    fn set_mix_gain(&mut self, gain: f32) {
        self.inner.set_mix_gain(gain);
    }

    fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.inner.is_note_active(note, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::AudioClip;
    use crate::player::LoopPlayer;
    use basic_au_core::AudioBuffer;
    use std::sync::Arc;

    /// A single impulse followed by silence.
    fn impulse_player() -> LoopPlayer {
        let mut samples = vec![0.0; 8192];
        samples[0] = 1.0;
        LoopPlayer::new(Arc::new(AudioClip::mono(samples, 44100.0).unwrap())).with_looping(false)
    }

    #[test]
    fn test_dry_only_passes_through() {
        let mut reverb = Reverb::new(impulse_player()).with_dry_wet_mix(0.0);
        reverb.prepare(&RenderFormat::default()).unwrap();
        reverb.start();

        let mut buffer = AudioBuffer::stereo(4);
        reverb.render(&mut buffer.slice_mut(0..4).unwrap()).unwrap();
        assert_eq!(buffer.channel(0), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wet_tail_after_comb_delay() {
        let mut reverb = Reverb::new(impulse_player()).with_dry_wet_mix(1.0);
        reverb.prepare(&RenderFormat::default()).unwrap();
        reverb.start();

        let mut buffer = AudioBuffer::stereo(4096);
        reverb.render(&mut buffer.slice_mut(0..4096).unwrap()).unwrap();
        // Nothing comes out before the shortest comb has delayed the impulse.
        assert_eq!(buffer.peak(0..1116), 0.0);
        assert!(buffer.peak(1116..4096) > 0.0);
        assert!(buffer.channel(0).iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_render_before_prepare_fails() {
        let mut reverb = Reverb::new(impulse_player());
        let mut buffer = AudioBuffer::stereo(4);
        assert_eq!(
            reverb.render(&mut buffer.slice_mut(0..4).unwrap()),
            Err(SourceError::NotPrepared)
        );
    }

    #[test]
    fn test_forwards_lifecycle() {
        let mut reverb = Reverb::new(impulse_player());
        reverb.prepare(&RenderFormat::default()).unwrap();
        reverb.start();
        assert!(reverb.is_running());
        assert!(reverb.inner().is_running());
        reverb.stop();
        assert!(!reverb.is_running());
    }
}
