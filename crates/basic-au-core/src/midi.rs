//! MIDI 1.0 channel voice messages.
//!
//! Render events carry raw MIDI bytes; [`MidiMessage::parse`] turns them into
//! a typed [`MidiMessage`] the event walker can dispatch. All types here are
//! `Copy` so parsing on the render thread never allocates.

/// MIDI channel (0-15).
pub type MidiChannel = u8;

/// MIDI note number (0-127, where 60 = middle C).
pub type MidiNote = u8;

/// Well-known controller numbers.
pub mod cc {
    /// Modulation wheel (CC 1).
    pub const MOD_WHEEL: u8 = 1;
    /// Channel volume (CC 7).
    pub const VOLUME: u8 = 7;
    /// Sustain pedal (CC 64).
    pub const SUSTAIN_PEDAL: u8 = 64;
    /// All sound off (CC 120).
    pub const ALL_SOUND_OFF: u8 = 120;
    /// All notes off (CC 123).
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// MIDI 1.0 channel voice status nibbles.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Midi1Status {
    NoteOff = 0x80,
    NoteOn = 0x90,
    PolyPressure = 0xA0,
    ControlChange = 0xB0,
    ProgramChange = 0xC0,
    ChannelPressure = 0xD0,
    PitchBend = 0xE0,
}

impl Midi1Status {
    /// Decode the upper nibble of a status byte.
    ///
    /// Returns `None` for data bytes (running status) and system messages.
    pub const fn from_status_byte(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(Self::NoteOff),
            0x90 => Some(Self::NoteOn),
            0xA0 => Some(Self::PolyPressure),
            0xB0 => Some(Self::ControlChange),
            0xC0 => Some(Self::ProgramChange),
            0xD0 => Some(Self::ChannelPressure),
            0xE0 => Some(Self::PitchBend),
            _ => None,
        }
    }
}

/// A parsed channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on with non-zero velocity.
    NoteOn {
        channel: MidiChannel,
        note: MidiNote,
        velocity: u8,
    },
    /// Note off. Note-on with velocity 0 also parses to this variant.
    NoteOff {
        channel: MidiChannel,
        note: MidiNote,
        velocity: u8,
    },
    /// Controller change.
    ControlChange {
        channel: MidiChannel,
        controller: u8,
        value: u8,
    },
    /// 14-bit pitch bend, 0..=16383 with 8192 at center.
    PitchBend { channel: MidiChannel, value: u16 },
    /// Polyphonic key pressure.
    PolyPressure {
        channel: MidiChannel,
        note: MidiNote,
        pressure: u8,
    },
    /// Program change.
    ProgramChange { channel: MidiChannel, program: u8 },
    /// Channel pressure.
    ChannelPressure { channel: MidiChannel, pressure: u8 },
}

/// Center value of a 14-bit pitch bend.
pub const PITCH_BEND_CENTER: u16 = 8192;

impl MidiMessage {
    /// Parse up to three MIDI bytes.
    ///
    /// `length` is the number of valid bytes in `data`. Missing data bytes
    /// read as zero. Returns `None` for running status, system messages and
    /// empty input.
    pub fn parse(data: [u8; 3], length: usize) -> Option<Self> {
        if length == 0 {
            return None;
        }
        let status = Midi1Status::from_status_byte(data[0])?;
        let channel = data[0] & 0x0F;
        let data1 = if length >= 2 { data[1] & 0x7F } else { 0 };
        let data2 = if length >= 3 { data[2] & 0x7F } else { 0 };

        let message = match status {
            Midi1Status::NoteOff => Self::NoteOff {
                channel,
                note: data1,
                velocity: data2,
            },
            Midi1Status::NoteOn => {
                if data2 == 0 {
                    // Note On with velocity 0 = Note Off
                    Self::NoteOff {
                        channel,
                        note: data1,
                        velocity: 0,
                    }
                } else {
                    Self::NoteOn {
                        channel,
                        note: data1,
                        velocity: data2,
                    }
                }
            }
            Midi1Status::PolyPressure => Self::PolyPressure {
                channel,
                note: data1,
                pressure: data2,
            },
            Midi1Status::ControlChange => Self::ControlChange {
                channel,
                controller: data1,
                value: data2,
            },
            Midi1Status::ProgramChange => Self::ProgramChange {
                channel,
                program: data1,
            },
            Midi1Status::ChannelPressure => Self::ChannelPressure {
                channel,
                pressure: data1,
            },
            Midi1Status::PitchBend => Self::PitchBend {
                channel,
                // data1 = LSB, data2 = MSB
                value: ((data2 as u16) << 7) | (data1 as u16),
            },
        };
        Some(message)
    }

    /// Encode back to raw bytes and the number of valid bytes.
    pub fn to_bytes(self) -> ([u8; 3], usize) {
        match self {
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => ([0x90 | channel, note, velocity], 3),
            Self::NoteOff {
                channel,
                note,
                velocity,
            } => ([0x80 | channel, note, velocity], 3),
            Self::ControlChange {
                channel,
                controller,
                value,
            } => ([0xB0 | channel, controller, value], 3),
            Self::PitchBend { channel, value } => (
                [0xE0 | channel, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8],
                3,
            ),
            Self::PolyPressure {
                channel,
                note,
                pressure,
            } => ([0xA0 | channel, note, pressure], 3),
            Self::ProgramChange { channel, program } => ([0xC0 | channel, program, 0], 2),
            Self::ChannelPressure { channel, pressure } => ([0xD0 | channel, pressure, 0], 2),
        }
    }

    /// The message's channel.
    pub const fn channel(&self) -> MidiChannel {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::PitchBend { channel, .. }
            | Self::PolyPressure { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. } => channel,
        }
    }
}

/// Convert a 14-bit pitch bend value to -1.0..=1.0 (0.0 at center).
#[inline]
pub fn pitch_bend_to_bipolar(value: u16) -> f32 {
    (value.min(16383) as f32 - PITCH_BEND_CENTER as f32) / PITCH_BEND_CENTER as f32
}

/// Equal-tempered frequency of a MIDI note (A4 = 69 = 440 Hz).
#[inline]
pub fn note_to_frequency(note: MidiNote) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}
