//! Event queue walker.
//!
//! [`EventWalker`] traverses one render call's events exactly once, in
//! order, dispatching each to the parameter registry or the signal source.
//! The engine drives it either in one go (`dispatch_all`) or segment by
//! segment (`dispatch_through`) when splitting a call at event offsets.
//!
//! Dispatch never allocates and never stops early: an event addressed to an
//! unknown parameter is recorded in the [`WalkReport`] and the walk goes on.

use crate::error::RenderError;
use crate::events::{RenderEvent, RenderEventKind};
use crate::midi::MidiMessage;
use crate::parameters::ParameterRegistry;
use crate::source::SignalSource;
use crate::types::{ParameterAddress, SampleOffset};

/// Where dispatched events go.
pub struct DispatchTarget<'a> {
    /// Registry receiving parameter sets and ramps.
    pub registry: &'a ParameterRegistry,
    /// Source receiving MIDI.
    pub source: &'a mut dyn SignalSource,
    /// Parameter whose value is also forwarded to `SignalSource::set_mix_gain`.
    pub mix_gain_address: Option<ParameterAddress>,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The event changed registry or source state.
    Applied,
    /// The event was not understood and had no effect.
    Ignored,
    /// The event could not be applied.
    Failed(RenderError),
}

/// Counters collected while walking one render call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkReport {
    /// Events that changed state.
    pub applied: u32,
    /// Unrecognised events that were skipped.
    pub ignored: u32,
    /// First failure, if any. Later events were still dispatched.
    pub first_error: Option<RenderError>,
}

impl WalkReport {
    fn record(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Applied => self.applied += 1,
            Dispatch::Ignored => self.ignored += 1,
            Dispatch::Failed(err) => {
                if self.first_error.is_none() {
                    self.first_error = Some(err);
                }
            }
        }
    }
}

/// Apply a single event.
pub fn dispatch(event: &RenderEvent, target: &mut DispatchTarget<'_>) -> Dispatch {
    match event.kind {
        RenderEventKind::Midi { data, length } => {
            match MidiMessage::parse(data, length as usize) {
                Some(message) => dispatch_midi(message, target.source),
                None => Dispatch::Ignored,
            }
        }
        RenderEventKind::ParameterSet { address, value } => {
            set_parameter(address, value, target)
        }
        // Ramps land as an immediate set of the target at the event's offset.
        RenderEventKind::ParameterRamp { address, target: value, .. } => {
            set_parameter(address, value, target)
        }
        RenderEventKind::Unknown(_) => Dispatch::Ignored,
    }
}

fn set_parameter(address: ParameterAddress, value: f32, target: &mut DispatchTarget<'_>) -> Dispatch {
    match target.registry.set(address, value) {
        Ok(stored) => {
            if target.mix_gain_address == Some(address) {
                target.source.set_mix_gain(stored);
            }
            Dispatch::Applied
        }
        Err(err) => Dispatch::Failed(err),
    }
}

fn dispatch_midi(message: MidiMessage, source: &mut dyn SignalSource) -> Dispatch {
    match message {
        MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        } => source.note_on(note, velocity, channel),
        // Also covers note-on with velocity 0.
        MidiMessage::NoteOff { channel, note, .. } => source.note_off(note, channel),
        MidiMessage::ControlChange {
            channel,
            controller,
            value,
        } => source.control_change(controller, value, channel),
        MidiMessage::PitchBend { channel, value } => source.pitch_bend(value, channel),
        MidiMessage::PolyPressure { .. }
        | MidiMessage::ProgramChange { .. }
        | MidiMessage::ChannelPressure { .. } => return Dispatch::Ignored,
    }
    Dispatch::Applied
}

/// Single-pass cursor over one render call's events.
pub struct EventWalker<'e> {
    events: &'e [RenderEvent],
    position: usize,
    report: WalkReport,
}

impl<'e> EventWalker<'e> {
    /// Start walking `events`.
    pub fn new(events: &'e [RenderEvent]) -> Self {
        Self {
            events,
            position: 0,
            report: WalkReport::default(),
        }
    }

    /// Offset of the next undispatched event.
    #[inline]
    pub fn next_offset(&self) -> Option<SampleOffset> {
        self.events.get(self.position).map(|event| event.sample_offset)
    }

    /// Whether every event has been dispatched.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.position >= self.events.len()
    }

    /// Dispatch every remaining event whose offset is at or before `frame`.
    ///
    /// Events that arrive out of order (an offset below one already passed)
    /// are dispatched as soon as the cursor reaches them.
    pub fn dispatch_through(&mut self, frame: SampleOffset, target: &mut DispatchTarget<'_>) {
        while let Some(event) = self.events.get(self.position) {
            if event.sample_offset > frame {
                break;
            }
            self.report.record(dispatch(event, target));
            self.position += 1;
        }
    }

    /// Dispatch every remaining event regardless of offset.
    pub fn dispatch_all(&mut self, target: &mut DispatchTarget<'_>) {
        for event in &self.events[self.position..] {
            self.report.record(dispatch(event, target));
        }
        self.position = self.events.len();
    }

    /// Finish the walk and return its counters.
    pub fn finish(self) -> WalkReport {
        self.report
    }
}
