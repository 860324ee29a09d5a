//! The render engine.
//!
//! [`RenderEngine`] is the format-agnostic equivalent of an Audio Unit's
//! internal render block: given a frame count, the call's events and an
//! output buffer, it applies every event and renders the signal source.
//!
//! # Scheduling
//!
//! With [`SchedulingMode::SampleAccurate`] the call is split at event
//! offsets: events at offset `n` are applied before frame `n` is rendered,
//! so a note-off at 256 silences the voice from frame 256 on. With
//! [`SchedulingMode::BufferStart`] the whole list is applied first and the
//! full range is rendered in one pass.
//!
//! # Real-Time Safety
//!
//! `render` does not allocate, lock or log. Errors are returned as
//! [`RenderError`] values with `Copy` payloads and the engine stays usable
//! for the next call whatever the outcome of the previous one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::config::{EngineConfig, SchedulingMode};
use crate::error::{FormatError, RenderError, RenderResult};
use crate::events::RenderEvent;
use crate::format::RenderFormat;
use crate::lifecycle::{EngineState, LifecycleManager};
use crate::midi::{MidiChannel, MidiNote};
use crate::parameters::ParameterRegistry;
use crate::source::SourceFactory;
use crate::types::{ParameterAddress, SampleOffset};
use crate::walker::{DispatchTarget, EventWalker};

// =============================================================================
// Render statistics
// =============================================================================

/// Counters updated by the render thread, readable from any thread.
#[derive(Debug, Default)]
pub struct RenderStats {
    render_calls: AtomicU64,
    failed_calls: AtomicU64,
    frames_rendered: AtomicU64,
    ignored_events: AtomicU64,
    dropped_events: AtomicU64,
}

/// Point-in-time copy of [`RenderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStatsSnapshot {
    /// Render calls, successful or not.
    pub render_calls: u64,
    /// Render calls that returned an error.
    pub failed_calls: u64,
    /// Frames written by successful calls.
    pub frames_rendered: u64,
    /// Events skipped because they were not understood.
    pub ignored_events: u64,
    /// Host events lost because the per-call event list was full.
    pub dropped_events: u64,
}

impl RenderStats {
    /// Read every counter.
    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            render_calls: self.render_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            ignored_events: self.ignored_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }

    /// Count host events that never reached the engine.
    #[inline]
    pub fn record_dropped_events(&self, count: u64) {
        self.dropped_events.fetch_add(count, Ordering::Relaxed);
    }
}

// =============================================================================
// RenderEngine
// =============================================================================

/// Drives one signal source through the render lifecycle.
pub struct RenderEngine {
    registry: Arc<ParameterRegistry>,
    lifecycle: LifecycleManager,
    scheduling: SchedulingMode,
    mix_gain_address: Option<ParameterAddress>,
    stats: Arc<RenderStats>,
}

impl RenderEngine {
    /// Create an engine in the uninitialized state.
    pub fn new(registry: Arc<ParameterRegistry>, factory: SourceFactory) -> Self {
        Self {
            registry,
            lifecycle: LifecycleManager::new(factory),
            scheduling: SchedulingMode::default(),
            mix_gain_address: None,
            stats: Arc::new(RenderStats::default()),
        }
    }

    /// Set the scheduling mode.
    pub fn with_scheduling(mut self, scheduling: SchedulingMode) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Forward changes of `address` to the source's mix gain.
    pub fn with_mix_gain_parameter(mut self, address: ParameterAddress) -> Self {
        self.mix_gain_address = Some(address);
        self
    }

    /// Apply the scheduling mode from an engine configuration.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_scheduling(config.scheduling)
    }

    /// The parameter registry shared with the control thread.
    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    /// Render counters, shareable with other threads.
    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }

    /// Current scheduling mode.
    pub fn scheduling(&self) -> SchedulingMode {
        self.scheduling
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &EngineState {
        self.lifecycle.state()
    }

    /// Check if render resources are allocated.
    pub fn is_allocated(&self) -> bool {
        self.lifecycle.state().is_allocated()
    }

    /// Get the negotiated format (only when allocated).
    pub fn format(&self) -> Option<RenderFormat> {
        self.lifecycle.state().format().copied()
    }

    /// Whether the source has a voice sounding for `note`.
    pub fn is_note_active(&self, note: MidiNote, channel: MidiChannel) -> bool {
        self.lifecycle
            .resources()
            .is_some_and(|resources| resources.source.is_note_active(note, channel))
    }

    /// Allocate render resources for `format`. Control thread only.
    pub fn allocate(&mut self, format: RenderFormat) -> RenderResult<()> {
        self.lifecycle
            .allocate(format, &self.registry, self.mix_gain_address)
    }

    /// Release render resources. Idempotent.
    pub fn deallocate(&mut self) {
        self.lifecycle.deallocate();
    }

    /// Render `frame_count` frames into `output`, applying `events`.
    ///
    /// Frames at or past `frame_count` are never touched. If the call fails
    /// with [`RenderError::RenderFailed`] the written range is undefined. An
    /// event naming an unknown parameter does not stop the call: the audio
    /// is rendered and the first such error is returned afterwards.
    pub fn render(
        &mut self,
        frame_count: u32,
        events: &[RenderEvent],
        output: &mut AudioBuffer,
    ) -> RenderResult<()> {
        self.stats.render_calls.fetch_add(1, Ordering::Relaxed);
        let result = self.render_inner(frame_count, events, output);
        match &result {
            Ok(()) => {
                self.stats
                    .frames_rendered
                    .fetch_add(frame_count as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.failed_calls.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    /// Count a call that was refused before reaching the engine and return
    /// its error.
    ///
    /// For callers that validate host data up front: the call shows up in
    /// the stats like any other failed call, and no event or voice state
    /// changes.
    pub fn reject(&self, error: RenderError) -> RenderResult<()> {
        self.stats.render_calls.fetch_add(1, Ordering::Relaxed);
        self.stats.failed_calls.fetch_add(1, Ordering::Relaxed);
        Err(error)
    }

    fn render_inner(
        &mut self,
        frame_count: u32,
        events: &[RenderEvent],
        output: &mut AudioBuffer,
    ) -> RenderResult<()> {
        let resources = self
            .lifecycle
            .resources_mut()
            .ok_or(RenderError::InvalidState("render called without allocated resources"))?;
        let format = resources.format;

        if frame_count > format.max_frames {
            return Err(RenderError::BufferOverrun {
                requested: frame_count,
                maximum: format.max_frames,
            });
        }
        if (frame_count as usize) > output.capacity() {
            return Err(RenderError::BufferOverrun {
                requested: frame_count,
                maximum: output.capacity().min(u32::MAX as usize) as u32,
            });
        }
        if output.channel_count() != format.channel_count {
            return Err(RenderError::UnsupportedFormat(FormatError::ChannelCount {
                expected: format.channel_count,
                actual: output.channel_count(),
            }));
        }

        let registry: &ParameterRegistry = &self.registry;
        let mix_gain_address = self.mix_gain_address;
        let source = &mut resources.source;
        let mut walker = EventWalker::new(events);
        let mut render_error = None;

        match self.scheduling {
            SchedulingMode::BufferStart => {
                walker.dispatch_all(&mut DispatchTarget {
                    registry,
                    source: &mut **source,
                    mix_gain_address,
                });
                render_error = render_range(&mut **source, output, 0, frame_count).err();
            }
            SchedulingMode::SampleAccurate => {
                let mut cursor: SampleOffset = 0;
                loop {
                    walker.dispatch_through(
                        cursor,
                        &mut DispatchTarget {
                            registry,
                            source: &mut **source,
                            mix_gain_address,
                        },
                    );
                    // Everything at or before `cursor` is applied, so the
                    // next offset is strictly ahead of it.
                    let end = walker
                        .next_offset()
                        .map_or(frame_count, |offset| offset.min(frame_count));
                    if end > cursor {
                        if let Err(err) = render_range(&mut **source, output, cursor, end) {
                            render_error = Some(err);
                            break;
                        }
                        cursor = end;
                    }
                    if cursor >= frame_count {
                        break;
                    }
                }
                // Offsets past the end of the call land after the last frame,
                // and a failed sub-block still applies the rest of the list.
                walker.dispatch_all(&mut DispatchTarget {
                    registry,
                    source: &mut **source,
                    mix_gain_address,
                });
            }
        }

        let report = walker.finish();
        if report.ignored > 0 {
            self.stats
                .ignored_events
                .fetch_add(report.ignored as u64, Ordering::Relaxed);
        }
        if let Some(err) = render_error {
            return Err(err);
        }
        match report.first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn render_range(
    source: &mut dyn crate::source::SignalSource,
    output: &mut AudioBuffer,
    start: SampleOffset,
    end: SampleOffset,
) -> RenderResult<()> {
    let maximum = output.capacity().min(u32::MAX as usize) as u32;
    let mut slice = output
        .slice_mut(start as usize..end as usize)
        .ok_or(RenderError::BufferOverrun {
            requested: end,
            maximum,
        })?;
    source.render(&mut slice).map_err(RenderError::RenderFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RenderSlice;
    use crate::error::SourceError;
    use crate::parameter_info::ParameterInfo;
    use crate::source::SignalSource;

    /// Writes a constant level while any note is held.
    #[derive(Default)]
    struct GateSource {
        held: Vec<(u8, u8)>,
        gain: f32,
        fail: bool,
    }

    impl SignalSource for GateSource {
        fn prepare(&mut self, _format: &RenderFormat) -> RenderResult<()> {
            self.held.reserve(16);
            Ok(())
        }
        fn start(&mut self) {}
        fn stop(&mut self) {}
        fn is_running(&self) -> bool {
            true
        }
        fn render(&mut self, output: &mut RenderSlice<'_>) -> Result<(), SourceError> {
            if self.fail {
                return Err(SourceError::Failed("forced"));
            }
            let level = if self.held.is_empty() { 0.0 } else { self.gain };
            for frame in 0..output.len() {
                output.write_frame(frame, level, level);
            }
            Ok(())
        }
        fn note_on(&mut self, note: u8, _velocity: u8, channel: u8) {
            self.held.push((note, channel));
        }
        fn note_off(&mut self, note: u8, channel: u8) {
            self.held.retain(|&voice| voice != (note, channel));
        }
        fn control_change(&mut self, controller: u8, _value: u8, _channel: u8) {
            match controller {
                99 => self.fail = true,
                98 => self.fail = false,
                _ => {}
            }
        }
        fn set_mix_gain(&mut self, gain: f32) {
            self.gain = gain;
        }
        fn is_note_active(&self, note: u8, channel: u8) -> bool {
            self.held.contains(&(note, channel))
        }
    }

    fn engine(scheduling: SchedulingMode) -> RenderEngine {
        let registry = Arc::new(
            ParameterRegistry::new(&[ParameterInfo::new(0, "gain", "Gain").with_default(0.25)])
                .unwrap(),
        );
        let factory: SourceFactory = Box::new(|_format: &RenderFormat| {
            Ok(Box::new(GateSource::default()) as Box<dyn SignalSource>)
        });
        RenderEngine::new(registry, factory)
            .with_scheduling(scheduling)
            .with_mix_gain_parameter(0)
    }

    #[test]
    fn test_render_requires_allocation() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        let mut buffer = AudioBuffer::stereo(64);
        assert!(matches!(
            engine.render(64, &[], &mut buffer),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_overrun_leaves_buffer_untouched() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 128)).unwrap();
        let mut buffer = AudioBuffer::stereo(256);
        buffer.fill(7.0);

        let events = [RenderEvent::note_on(0, 60, 100, 0)];
        assert_eq!(
            engine.render(129, &events, &mut buffer),
            Err(RenderError::BufferOverrun {
                requested: 129,
                maximum: 128
            })
        );
        assert!(buffer.channel(0).iter().all(|&s| s == 7.0));
        assert!(!engine.is_note_active(60, 0));
    }

    #[test]
    fn test_small_buffer_is_overrun() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 512)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);
        assert!(matches!(
            engine.render(128, &[], &mut buffer),
            Err(RenderError::BufferOverrun { maximum: 64, .. })
        ));
    }

    #[test]
    fn test_sample_accurate_note_boundaries() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 512)).unwrap();
        let mut buffer = AudioBuffer::stereo(512);

        let events = [
            RenderEvent::note_on(0, 60, 100, 0),
            RenderEvent::note_off(256, 60, 0),
        ];
        engine.render(512, &events, &mut buffer).unwrap();

        assert!(buffer.channel(0)[..256].iter().all(|&s| s == 0.25));
        assert!(buffer.channel(1)[256..].iter().all(|&s| s == 0.0));
        assert!(!engine.is_note_active(60, 0));
    }

    #[test]
    fn test_buffer_start_applies_everything_first() {
        let mut engine = engine(SchedulingMode::BufferStart);
        engine.allocate(RenderFormat::stereo(44100.0, 512)).unwrap();
        let mut buffer = AudioBuffer::stereo(512);

        let events = [
            RenderEvent::note_on(0, 60, 100, 0),
            RenderEvent::note_off(256, 60, 0),
        ];
        engine.render(512, &events, &mut buffer).unwrap();
        assert_eq!(buffer.peak(0..512), 0.0);
    }

    #[test]
    fn test_parameter_change_mid_buffer() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);

        let events = [
            RenderEvent::note_on(0, 60, 100, 0),
            RenderEvent::parameter_set(32, 0, 0.5),
        ];
        engine.render(64, &events, &mut buffer).unwrap();
        assert_eq!(buffer.channel(0)[31], 0.25);
        assert_eq!(buffer.channel(0)[32], 0.5);
        assert_eq!(engine.registry().get(0).unwrap(), 0.5);
    }

    #[test]
    fn test_offsets_past_end_still_applied() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);

        engine
            .render(16, &[RenderEvent::parameter_set(1000, 0, 0.75)], &mut buffer)
            .unwrap();
        assert_eq!(engine.registry().get(0).unwrap(), 0.75);
    }

    #[test]
    fn test_only_requested_frames_written() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);
        buffer.fill(9.0);

        engine.render(16, &[], &mut buffer).unwrap();
        assert_eq!(buffer.channel(0)[15], 0.0);
        assert_eq!(buffer.channel(0)[16], 9.0);
    }

    #[test]
    fn test_source_failure_then_recovery() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);

        let events = [RenderEvent::midi_bytes(0, [0xB0, 99, 0], 3)];
        assert_eq!(
            engine.render(64, &events, &mut buffer),
            Err(RenderError::RenderFailed(SourceError::Failed("forced")))
        );
        let stats = engine.stats().snapshot();
        assert_eq!(stats.render_calls, 1);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.frames_rendered, 0);

        let events = [
            RenderEvent::midi_bytes(0, [0xB0, 98, 0], 3),
            RenderEvent::note_on(0, 60, 100, 0),
        ];
        engine.render(64, &events, &mut buffer).unwrap();
        assert!(buffer.channel(0).iter().all(|&s| s == 0.25));

        let stats = engine.stats().snapshot();
        assert_eq!(stats.render_calls, 2);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.frames_rendered, 64);
    }

    #[test]
    fn test_source_failure_applies_remaining_events() {
        for scheduling in [SchedulingMode::SampleAccurate, SchedulingMode::BufferStart] {
            let mut engine = engine(scheduling);
            engine.allocate(RenderFormat::stereo(44100.0, 512)).unwrap();
            let mut buffer = AudioBuffer::stereo(512);

            let events = [
                RenderEvent::note_on(0, 60, 100, 0),
                RenderEvent::midi_bytes(0, [0xB0, 99, 0], 3),
                RenderEvent::note_off(256, 60, 0),
                RenderEvent::parameter_set(300, 0, 0.9),
                RenderEvent::new(400, crate::events::RenderEventKind::Unknown(9)),
            ];
            assert_eq!(
                engine.render(512, &events, &mut buffer),
                Err(RenderError::RenderFailed(SourceError::Failed("forced")))
            );
            assert!(!engine.is_note_active(60, 0));
            assert_eq!(engine.registry().get(0).unwrap(), 0.9);
            assert_eq!(engine.stats().snapshot().ignored_events, 1);
        }
    }

    #[test]
    fn test_rejected_call_is_counted() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();

        assert_eq!(
            engine.reject(RenderError::InvalidBuffer("null output")),
            Err(RenderError::InvalidBuffer("null output"))
        );
        let stats = engine.stats().snapshot();
        assert_eq!(stats.render_calls, 1);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.frames_rendered, 0);
    }

    #[test]
    fn test_unknown_address_reported_after_render() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);
        buffer.fill(1.0);

        let events = [RenderEvent::parameter_set(0, 5, 0.5)];
        assert_eq!(
            engine.render(64, &events, &mut buffer),
            Err(RenderError::InvalidParameterAddress(5))
        );
        assert_eq!(buffer.peak(0..64), 0.0);
    }

    #[test]
    fn test_repeated_renders_reuse_resources() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);

        engine.render(64, &[], &mut buffer).unwrap();
        engine.render(64, &[], &mut buffer).unwrap();
        let stats = engine.stats().snapshot();
        assert_eq!(stats.render_calls, 2);
        assert_eq!(stats.frames_rendered, 128);
    }

    #[test]
    fn test_ignored_events_counted() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::stereo(64);

        let events = [RenderEvent::new(3, crate::events::RenderEventKind::Unknown(10))];
        engine.render(64, &events, &mut buffer).unwrap();
        assert_eq!(engine.stats().snapshot().ignored_events, 1);
    }

    #[test]
    fn test_mono_buffer_rejected() {
        let mut engine = engine(SchedulingMode::SampleAccurate);
        engine.allocate(RenderFormat::stereo(44100.0, 64)).unwrap();
        let mut buffer = AudioBuffer::new(1, 64);
        assert!(matches!(
            engine.render(64, &[], &mut buffer),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }
}
