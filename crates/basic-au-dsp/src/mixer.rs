//! Output gain stage.
//!
//! [`Mixer`] scales its inner source by a [`MixLevel`], a lock-free `f32`
//! shared between the render thread and whatever control-thread code holds
//! a clone (typically a parameter observer).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use basic_au_core::{
    MidiChannel, MidiNote, RenderFormat, RenderResult, RenderSlice, SignalSource, SourceError,
};

/// Level applied before the first explicit change.
pub const INITIAL_MIX_LEVEL: f32 = 0.25;

/// Shared, lock-free gain value.
#[derive(Debug, Clone)]
pub struct MixLevel(Arc<AtomicU32>);

impl MixLevel {
    /// Create a level.
    pub fn new(level: f32) -> Self {
        Self(Arc::new(AtomicU32::new(level.to_bits())))
    }

    /// Current level.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Store a new level.
    #[inline]
    pub fn set(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Release);
    }
}

impl Default for MixLevel {
    fn default() -> Self {
        Self::new(INITIAL_MIX_LEVEL)
    }
}

/// Final gain stage of a signal chain.
#[derive(Debug)]
pub struct Mixer<S> {
    inner: S,
    level: MixLevel,
}

impl<S: SignalSource> Mixer<S> {
    /// Mix `inner` at `level`.
    pub fn new(inner: S, level: MixLevel) -> Self {
        Self { inner, level }
    }

    /// Handle to the level this mixer reads.
    pub fn level(&self) -> &MixLevel {
        &self.level
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SignalSource> SignalSource for Mixer<S> {
    fn prepare(&mut self, format: &RenderFormat) -> RenderResult<()> {
        self.inner.prepare(format)
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
        self.inner.render(output)?;
        // One read per block.
        output.apply_gain(self.level.get());
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
        self.level.set(gain);
    }

    fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.inner.is_note_active(note, channel)
    }
}
