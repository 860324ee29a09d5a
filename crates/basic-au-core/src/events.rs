//! Render events for one render call.
//!
//! Hosts deliver MIDI and parameter automation as a time-ordered sequence of
//! [`RenderEvent`]s. The format layer decodes the host's representation into
//! an [`EventList`] that was allocated up front, so filling it on the render
//! thread never allocates. Events are only valid for the call that carries
//! them; nothing in the core keeps them past `render`.

use crate::midi::MidiMessage;
use crate::types::{ParameterAddress, ParameterValue, SampleOffset};

/// Maximum number of events per render call.
///
/// Configurable via Cargo features:
/// - default: 256 events
/// - `events-512`: 512 events
/// - `events-1024`: 1024 events
#[cfg(feature = "events-1024")]
pub const MAX_RENDER_EVENTS: usize = 1024;
#[cfg(all(feature = "events-512", not(feature = "events-1024")))]
pub const MAX_RENDER_EVENTS: usize = 512;
#[cfg(not(any(feature = "events-512", feature = "events-1024")))]
pub const MAX_RENDER_EVENTS: usize = 256;

/// What a render event does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderEventKind {
    /// Raw MIDI 1.0 bytes. Parsed by the walker; unparseable data is ignored.
    Midi { data: [u8; 3], length: u8 },
    /// Immediate parameter change.
    ParameterSet {
        address: ParameterAddress,
        value: ParameterValue,
    },
    /// Parameter change meant to glide over `duration_samples`.
    ///
    /// Applied as an immediate set of `target` at the event's offset.
    ParameterRamp {
        address: ParameterAddress,
        target: ParameterValue,
        duration_samples: u32,
    },
    /// An event type the core does not handle, tagged with the host's type
    /// code. Always ignored.
    Unknown(u8),
}

/// A render event positioned relative to the first frame of the call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEvent {
    /// Frame offset within the current render call.
    pub sample_offset: SampleOffset,
    /// The event payload.
    pub kind: RenderEventKind,
}

impl RenderEvent {
    /// Create an event.
    pub const fn new(sample_offset: SampleOffset, kind: RenderEventKind) -> Self {
        Self {
            sample_offset,
            kind,
        }
    }

    /// MIDI event from a parsed message.
    pub fn midi(sample_offset: SampleOffset, message: MidiMessage) -> Self {
        let (data, length) = message.to_bytes();
        Self::midi_bytes(sample_offset, data, length as u8)
    }

    /// MIDI event from raw bytes.
    pub const fn midi_bytes(sample_offset: SampleOffset, data: [u8; 3], length: u8) -> Self {
        Self::new(sample_offset, RenderEventKind::Midi { data, length })
    }

    /// Note-on.
    pub const fn note_on(sample_offset: SampleOffset, note: u8, velocity: u8, channel: u8) -> Self {
        Self::midi_bytes(sample_offset, [0x90 | (channel & 0x0F), note, velocity], 3)
    }

    /// Note-off.
    pub const fn note_off(sample_offset: SampleOffset, note: u8, channel: u8) -> Self {
        Self::midi_bytes(sample_offset, [0x80 | (channel & 0x0F), note, 0], 3)
    }

    /// Parameter set.
    pub const fn parameter_set(
        sample_offset: SampleOffset,
        address: ParameterAddress,
        value: ParameterValue,
    ) -> Self {
        Self::new(sample_offset, RenderEventKind::ParameterSet { address, value })
    }

    /// Parameter ramp.
    pub const fn parameter_ramp(
        sample_offset: SampleOffset,
        address: ParameterAddress,
        target: ParameterValue,
        duration_samples: u32,
    ) -> Self {
        Self::new(
            sample_offset,
            RenderEventKind::ParameterRamp {
                address,
                target,
                duration_samples,
            },
        )
    }
}

impl Default for RenderEvent {
    fn default() -> Self {
        Self::new(0, RenderEventKind::Unknown(0))
    }
}

/// Fixed-capacity event storage reused across render calls.
///
/// Events should be added in chronological order (by `sample_offset`).
#[derive(Debug)]
pub struct EventList {
    events: [RenderEvent; MAX_RENDER_EVENTS],
    len: usize,
    /// Pushes refused since the last clear
    dropped: usize,
}

impl EventList {
    /// Create an empty list. Allocate this off the render thread.
    pub fn new() -> Self {
        Self {
            events: [RenderEvent::default(); MAX_RENDER_EVENTS],
            len: 0,
            dropped: 0,
        }
    }

    /// Remove all events.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.dropped = 0;
    }

    /// Number of events.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any push failed since the last clear.
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.dropped > 0
    }

    /// Number of events refused since the last clear.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Append an event.
    ///
    /// Returns `false` and counts the event as dropped when the list is full.
    #[inline]
    pub fn push(&mut self, event: RenderEvent) -> bool {
        if self.len < MAX_RENDER_EVENTS {
            self.events[self.len] = event;
            self.len += 1;
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// The stored events.
    #[inline]
    pub fn as_slice(&self) -> &[RenderEvent] {
        &self.events[..self.len]
    }

    /// Iterate over the stored events.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &RenderEvent> {
        self.as_slice().iter()
    }
}

impl Default for EventList {
    fn default() -> Self {
        Self::new()
    }
}
