//! AU-specific plugin configuration.
//!
//! This module provides Audio Unit registration data that complements the
//! shared [`basic_au_core::PluginConfig`]: the component type and the
//! manufacturer/subtype codes a host uses to find the unit.

use std::fmt;

/// AU component type (4-character code).
///
/// This determines how the host categorizes and uses the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// Audio effect (aufx) - processes audio, no MIDI input.
    Effect,

    /// Music device/instrument (aumu) - generates audio from MIDI.
    MusicDevice,

    /// Generator (augn) - produces audio without MIDI, e.g. a file player.
    Generator,

    /// MIDI processor (aumi) - processes MIDI, may or may not process audio.
    MidiProcessor,
}

impl ComponentType {
    /// The component type as a FourCC.
    pub const fn code(&self) -> FourCharCode {
        match self {
            Self::Effect => FourCharCode(*b"aufx"),
            Self::MusicDevice => FourCharCode(*b"aumu"),
            Self::Generator => FourCharCode(*b"augn"),
            Self::MidiProcessor => FourCharCode(*b"aumi"),
        }
    }

    /// Get the component type as a 32-bit FourCC value (big-endian).
    pub const fn as_u32(&self) -> u32 {
        self.code().as_u32()
    }

    /// Look up a component type by its code.
    pub fn from_code(code: FourCharCode) -> Option<Self> {
        [
            Self::Effect,
            Self::MusicDevice,
            Self::Generator,
            Self::MidiProcessor,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }

    /// Whether hosts route MIDI into units of this type.
    pub const fn accepts_midi(&self) -> bool {
        matches!(self, Self::MusicDevice | Self::MidiProcessor)
    }
}

/// Four-character code (FourCC) for AU identifiers.
///
/// Must be exactly 4 ASCII characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCharCode(pub [u8; 4]);

impl FourCharCode {
    /// Create a new FourCharCode from a 4-byte array.
    ///
    /// # Panics
    /// Debug builds will panic if any byte is not ASCII.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        debug_assert!(bytes[0].is_ascii(), "FourCC bytes must be ASCII");
        debug_assert!(bytes[1].is_ascii(), "FourCC bytes must be ASCII");
        debug_assert!(bytes[2].is_ascii(), "FourCC bytes must be ASCII");
        debug_assert!(bytes[3].is_ascii(), "FourCC bytes must be ASCII");
        Self(*bytes)
    }

    /// Parse a runtime string such as `"aumu"`.
    ///
    /// Returns `None` unless the string is exactly four ASCII bytes.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes: [u8; 4] = text.as_bytes().try_into().ok()?;
        bytes.iter().all(u8::is_ascii).then_some(Self(bytes))
    }

    /// Get the FourCC as a 32-bit value (big-endian).
    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Get the FourCC as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Macro for creating FourCharCode at compile time with validation.
///
/// ```ignore
/// use basic_au::fourcc;
///
/// const SUBTYPE: FourCharCode = fourcc!(b"abau");
/// ```
///
/// Fails to compile unless the input is exactly 4 ASCII bytes.
#[macro_export]
macro_rules! fourcc {
    ($s:literal) => {{
        const BYTES: &[u8] = $s;
        const _: () = assert!(BYTES.len() == 4, "FourCC must be exactly 4 bytes");
        const _: () = assert!(BYTES[0].is_ascii(), "FourCC byte 0 must be ASCII");
        const _: () = assert!(BYTES[1].is_ascii(), "FourCC byte 1 must be ASCII");
        const _: () = assert!(BYTES[2].is_ascii(), "FourCC byte 2 must be ASCII");
        const _: () = assert!(BYTES[3].is_ascii(), "FourCC byte 3 must be ASCII");
        $crate::FourCharCode::new(&[BYTES[0], BYTES[1], BYTES[2], BYTES[3]])
    }};
}

/// Audio component registration data.
///
/// ```ignore
/// pub static AU_CONFIG: AuConfig = AuConfig::new(
///     ComponentType::MusicDevice,
///     fourcc!(b"Hwco"), // Manufacturer
///     fourcc!(b"abau"), // Subtype
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuConfig {
    /// Component type (aufx, aumu, augn, aumi).
    pub component_type: ComponentType,

    /// Manufacturer code.
    pub manufacturer: FourCharCode,

    /// Subtype code, unique within the manufacturer's namespace.
    pub subtype: FourCharCode,
}

impl AuConfig {
    /// Create a new AU configuration.
    pub const fn new(
        component_type: ComponentType,
        manufacturer: FourCharCode,
        subtype: FourCharCode,
    ) -> Self {
        Self {
            component_type,
            manufacturer,
            subtype,
        }
    }

    /// Same codes with a different component type.
    pub const fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    /// Whether this unit answers a host's component lookup.
    ///
    /// Codes are compared as written; a host searching for
    /// `aumu`/`abau`/`Hwco` finds exactly that registration.
    pub fn matches(&self, component_type: &str, subtype: &str, manufacturer: &str) -> bool {
        FourCharCode::parse(component_type) == Some(self.component_type.code())
            && FourCharCode::parse(subtype) == Some(self.subtype)
            && FourCharCode::parse(manufacturer) == Some(self.manufacturer)
    }
}

impl fmt::Display for AuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.component_type.code(),
            self.subtype,
            self.manufacturer
        )
    }
}
