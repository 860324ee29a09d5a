//! Render event ABI and decoding.
//!
//! Hosts hand the render block a singly linked list of `AURenderEvent`
//! unions, ordered by sample time and valid only for the duration of the
//! call. [`extract_render_events`] walks that list once and copies every
//! event into a pre-allocated [`EventList`] as a [`RenderEvent`] whose offset
//! is relative to the first frame of the call.

use basic_au_core::{EventList, MidiMessage, RenderEvent, RenderEventKind, SampleOffset};

// =============================================================================
// AU Render Event Types
// =============================================================================

/// AU render event types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AURenderEventType {
    /// Parameter change
    Parameter = 1,
    /// Parameter ramp over time
    ParameterRamp = 2,
    /// MIDI 1.0 event (legacy)
    Midi = 8,
    /// MIDI SysEx event
    MidiSysEx = 9,
    /// MIDI 2.0 UMP event list (iOS 15+, macOS 12+)
    MidiEventList = 10,
}

impl AURenderEventType {
    /// Decode the discriminator byte of an event header.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Parameter),
            2 => Some(Self::ParameterRamp),
            8 => Some(Self::Midi),
            9 => Some(Self::MidiSysEx),
            10 => Some(Self::MidiEventList),
            _ => None,
        }
    }
}

/// Sample time hosts use for "as soon as possible".
///
/// Events stamped `IMMEDIATE + n` apply at offset `n` of the current call.
pub const AU_EVENT_SAMPLE_TIME_IMMEDIATE: i64 = 0xffff_ffff_0000_0000_u64 as i64;

/// Common header for all AU render events.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AURenderEventHeader {
    /// Next event in the list, null if last.
    pub next: *const AURenderEvent,
    /// Absolute sample time of the event.
    pub event_sample_time: i64,
    /// Event type discriminator
    pub event_type: u8,
    /// Reserved, must be 0
    pub reserved: u8,
}

/// Parameter change or ramp.
///
/// Both [`AURenderEventType::Parameter`] and
/// [`AURenderEventType::ParameterRamp`] use this layout; for a ramp `value`
/// is the value reached after `ramp_duration_sample_frames`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AUParameterEvent {
    pub next: *const AURenderEvent,
    pub event_sample_time: i64,
    pub event_type: u8,
    pub reserved: [u8; 3],
    /// Zero for an immediate change.
    pub ramp_duration_sample_frames: u32,
    pub parameter_address: u64,
    pub value: f32,
}

/// Legacy MIDI 1.0 event.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AUMIDIEvent {
    pub next: *const AURenderEvent,
    pub event_sample_time: i64,
    /// Midi or MidiSysEx
    pub event_type: u8,
    pub reserved: u8,
    /// Number of valid MIDI bytes (1-3 for channel voice, more for SysEx)
    pub length: u16,
    /// Virtual cable number
    pub cable: u8,
    /// Status, data1, data2
    pub data: [u8; 3],
}

/// Header of a CoreMIDI `MIDIEventList`.
///
/// `num_packets` variable-length packets follow the header. Each packet is a
/// 64-bit timestamp and a 32-bit word count, packed to 4-byte alignment,
/// followed by that many UMP words.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MIDIEventList {
    /// 1 = MIDI 1.0 protocol, 2 = MIDI 2.0 protocol
    pub protocol: u32,
    pub num_packets: u32,
}

/// UMP event list render event.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AUMIDIEventList {
    pub next: *const AURenderEvent,
    pub event_sample_time: i64,
    pub event_type: u8,
    pub reserved: u8,
    pub cable: u8,
    /// Packets follow inline.
    pub event_list: MIDIEventList,
}

/// AU render event union.
///
/// Read `head.event_type` to determine which variant is active.
#[repr(C)]
pub union AURenderEvent {
    pub head: AURenderEventHeader,
    pub parameter: AUParameterEvent,
    pub midi: AUMIDIEvent,
    pub midi_events_list: AUMIDIEventList,
}

// =============================================================================
// Timestamp
// =============================================================================

/// SMPTE time structure.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SMPTETime {
    pub subframes: i16,
    pub subframe_divisor: i16,
    pub counter: u32,
    pub smpte_type: u32,
    pub flags: u32,
    pub hours: i16,
    pub minutes: i16,
    pub seconds: i16,
    pub frames: i16,
}

/// `AudioTimeStamp` flag: `sample_time` is valid.
pub const SAMPLE_TIME_VALID: u32 = 1 << 0;

/// Audio timestamp structure from Core Audio.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioTimeStamp {
    pub sample_time: f64,
    /// Host time (Mach absolute time)
    pub host_time: u64,
    pub rate_scalar: f64,
    pub word_clock_time: u64,
    pub smpte_time: SMPTETime,
    /// Flags indicating which fields are valid
    pub flags: u32,
    pub reserved: u32,
}

impl AudioTimeStamp {
    /// A timestamp carrying only a sample time.
    pub fn from_sample_time(sample_time: f64) -> Self {
        Self {
            sample_time,
            flags: SAMPLE_TIME_VALID,
            ..Self::default()
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Offset of an event within the call that starts at `call_start`.
///
/// Events stamped before the call (late delivery) apply at frame 0.
#[inline]
pub fn relative_offset(event_sample_time: i64, call_start: f64) -> SampleOffset {
    let relative = if (AU_EVENT_SAMPLE_TIME_IMMEDIATE..0).contains(&event_sample_time) {
        event_sample_time - AU_EVENT_SAMPLE_TIME_IMMEDIATE
    } else {
        event_sample_time.saturating_sub(call_start as i64)
    };
    relative.clamp(0, SampleOffset::MAX as i64) as SampleOffset
}

/// Copy a host event list into `list`.
///
/// `list` is cleared first. Events the list cannot hold are dropped and the
/// list records the overflow. SysEx is stored as
/// [`RenderEventKind::Unknown`] so the walker can count it as ignored.
/// Returns the number of events stored.
///
/// # Safety
///
/// `head` must be null or point to a valid, null-terminated list of events
/// that stays readable for the duration of the call. Event list entries must
/// contain as many packets and words as their headers claim.
pub unsafe fn extract_render_events(
    head: *const AURenderEvent,
    call_start: f64,
    list: &mut EventList,
) -> usize {
    list.clear();

    let mut event_ptr = head;
    while !event_ptr.is_null() {
        let event = &*event_ptr;
        let header = event.head;
        let offset = relative_offset(header.event_sample_time, call_start);

        match AURenderEventType::from_raw(header.event_type) {
            Some(AURenderEventType::Parameter) => {
                let parameter = event.parameter;
                list.push(RenderEvent::parameter_set(
                    offset,
                    parameter.parameter_address,
                    parameter.value,
                ));
            }
            Some(AURenderEventType::ParameterRamp) => {
                let parameter = event.parameter;
                list.push(RenderEvent::parameter_ramp(
                    offset,
                    parameter.parameter_address,
                    parameter.value,
                    parameter.ramp_duration_sample_frames,
                ));
            }
            Some(AURenderEventType::Midi) => {
                let midi = event.midi;
                let length = midi.length.min(3) as u8;
                list.push(RenderEvent::midi_bytes(offset, midi.data, length));
            }
            Some(AURenderEventType::MidiEventList) => {
                extract_ump_list(event_ptr, offset, list);
            }
            Some(AURenderEventType::MidiSysEx) | None => {
                list.push(RenderEvent::new(
                    offset,
                    RenderEventKind::Unknown(header.event_type),
                ));
            }
        }

        event_ptr = header.next;
    }

    list.len()
}

/// Size of a packet header: u64 timestamp plus u32 word count.
const PACKET_HEADER_BYTES: usize = 12;

/// Decode the MIDI 1.0 channel voice messages of a UMP event list.
///
/// Every message lands at the offset of the enclosing render event. Other
/// UMP message types are skipped.
unsafe fn extract_ump_list(event_ptr: *const AURenderEvent, offset: SampleOffset, list: &mut EventList) {
    let event_list = std::ptr::addr_of!((*event_ptr).midi_events_list.event_list);
    let num_packets = (*event_list).num_packets;
    let mut packet = (event_list as *const u8).add(std::mem::size_of::<MIDIEventList>());

    for _ in 0..num_packets {
        let word_count = std::ptr::read_unaligned(packet.add(8) as *const u32) as usize;
        let words = packet.add(PACKET_HEADER_BYTES) as *const u32;
        for index in 0..word_count {
            let word = std::ptr::read_unaligned(words.add(index));
            if let Some(message) = decode_ump_midi1(word) {
                list.push(RenderEvent::midi(offset, message));
            }
        }
        packet = packet.add(PACKET_HEADER_BYTES + word_count * 4);
    }
}

/// Decode a MIDI 1.0 channel voice UMP word (message type 2).
pub fn decode_ump_midi1(word: u32) -> Option<MidiMessage> {
    if (word >> 28) & 0xF != 2 {
        return None;
    }
    let [_, status, data1, data2] = word.to_be_bytes();
    MidiMessage::parse([status, data1 & 0x7F, data2 & 0x7F], 3)
}
