//! The signal source contract.
//!
//! A [`SignalSource`] is the DSP node the render engine drives: an
//! oscillator bank, a sampler, a file player, possibly wrapped in effects and
//! a mixer. The engine treats it as a black box with a fixed capability set.
//! Concrete sources are swappable strategy objects chosen when resources are
//! allocated.
//!
//! # Thread Model
//!
//! `prepare` runs on the control thread and may allocate. Every other method
//! is called from the render thread and must not allocate, block or perform
//! I/O.

use crate::buffer::RenderSlice;
use crate::error::{RenderResult, SourceError};
use crate::format::RenderFormat;
use crate::midi::{MidiChannel, MidiNote};

/// Audio-producing node driven by the render engine.
pub trait SignalSource: Send {
    /// Size internal state for `format`. Control thread only.
    ///
    /// Called once per allocation, before `start`.
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()>;

    /// Begin producing audio.
    fn start(&mut self);

    /// Stop producing audio. A stopped source renders silence.
    fn stop(&mut self);

    /// Whether the source is between `start` and `stop`.
    fn is_running(&self) -> bool;

    /// Write `output.len()` frames into `output`.
    ///
    /// Sources overwrite the slice; they do not mix into existing contents.
    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError>;

    /// Start a note.
    fn note_on(&mut self, _note: MidiNote, _velocity: u8, _channel: MidiChannel) {}

    /// Release a note.
    fn note_off(&mut self, _note: MidiNote, _channel: MidiChannel) {}

    /// Controller change.
    fn control_change(&mut self, _controller: u8, _value: u8, _channel: MidiChannel) {}

    /// 14-bit pitch bend (8192 = center).
    fn pitch_bend(&mut self, _amount: u16, _channel: MidiChannel) {}

    /// Set the output mix gain.
    fn set_mix_gain(&mut self, _gain: f32) {}

    /// Whether a voice is sounding for `note` on `channel`.
    ///
    /// Sources without voices report `false`.
    fn is_note_active(&self, _note: MidiNote, _channel: MidiChannel) -> bool {
        false
    }
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        (**self).prepare(format)
    }

    fn start(&mut self) {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
        (**self).render(output)
    }

    fn note_on(&mut self, note: MidiNote, velocity: u8, channel: MidiChannel) {
        (**self).note_on(note, velocity, channel)
    }

    fn note_off(&mut self, note: MidiNote, channel: MidiChannel) {
        (**self).note_off(note, channel)
    }

    fn control_change(&mut self, controller: u8, value: u8, channel: MidiChannel) {
        (**self).control_change(controller, value, channel)
    }

    fn pitch_bend(&mut self, amount: u16, channel: MidiChannel) {
        (**self).pitch_bend(amount, channel)
    }

    fn set_mix_gain(&mut self, gain: f32) {
        (**self).set_mix_gain(gain)
    }

    fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        (**self).is_note_active(note, channel)
    }
}

/// Builds the signal source when render resources are allocated.
///
/// Runs on the control thread. A failure surfaces as
/// [`RenderError::ResourceAllocationFailed`](crate::RenderError::ResourceAllocationFailed).
pub type SourceFactory =
    Box<dyn Fn(&RenderFormat) -> RenderResult<Box<dyn SignalSource>> + Send + Sync>;

/// A source that renders silence. Useful as a placeholder and in tests.
#[derive(Debug, Default)]
pub struct SilentSource {
    prepared: bool,
    running: bool,
}

impl SilentSource {
    /// Create an unprepared silent source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSource for SilentSource {
    fn prepare(&mut self, _format: &RenderFormat) -> RenderResult<()> {
        self.prepared = true;
        Ok(())
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
        if !self.prepared {
            return Err(SourceError::NotPrepared);
        }
        output.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AudioBuffer;

    #[test]
    fn test_silent_source_requires_prepare() {
        let mut source = SilentSource::new();
        let mut buffer = AudioBuffer::stereo(8);
        let mut slice = buffer.slice_mut(0..8).unwrap();
        assert_eq!(source.render(&mut slice), Err(SourceError::NotPrepared));

        source.prepare(&RenderFormat::default()).unwrap();
        source.start();
        assert!(source.is_running());
        assert!(source.render(&mut slice).is_ok());
    }

    #[test]
    fn test_boxed_source_forwards() {
        let mut source: Box<dyn SignalSource> = Box::new(SilentSource::new());
        source.prepare(&RenderFormat::default()).unwrap();
        source.start();
        assert!(source.is_running());
        source.stop();
        assert!(!source.is_running());
        assert!(!source.is_note_active(60, 0));
    }
}
