//! Error types for the render core.
//!
//! Variants produced on the render thread carry only `Copy` payloads so that
//! constructing an error never allocates. `String` payloads are reserved for
//! control-thread failures (resource allocation, state restore).

use thiserror::Error;

use crate::types::ParameterAddress;

/// Errors reported by a signal source while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source was asked to render before `prepare` succeeded.
    #[error("Source not prepared")]
    NotPrepared,

    /// The requested range is larger than the source's prepared capacity.
    #[error("Source capacity exceeded: {requested} frames requested, {capacity} prepared")]
    CapacityExceeded { requested: usize, capacity: usize },

    /// Source-specific failure.
    #[error("Source failure: {0}")]
    Failed(&'static str),
}

/// Reasons a render format was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FormatError {
    /// Only the fixed channel count is supported.
    #[error("expected {expected} channels, got {actual}")]
    ChannelCount { expected: usize, actual: usize },

    /// Sample rate is not a finite positive number.
    #[error("invalid sample rate {0}")]
    SampleRate(f64),

    /// Maximum frame count is zero or above the supported limit.
    #[error("invalid maximum frame count {requested} (limit {limit})")]
    MaxFrames { requested: u32, limit: u32 },
}

/// Errors that can occur in the render core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Channel or sample-rate negotiation failure.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(FormatError),

    /// A parameter address that is not in the registry.
    #[error("Invalid parameter address: {0}")]
    InvalidParameterAddress(ParameterAddress),

    /// More frames requested than were negotiated (or than the buffer holds).
    #[error("Buffer overrun: {requested} frames requested, maximum is {maximum}")]
    BufferOverrun { requested: u32, maximum: u32 },

    /// The signal source failed to render. Buffer contents are undefined.
    #[error("Render failed: {0}")]
    RenderFailed(SourceError),

    /// The signal source could not be constructed or prepared.
    #[error("Resource allocation failed: {0}")]
    ResourceAllocationFailed(String),

    /// Host-supplied output memory that cannot be written (null list,
    /// misaligned data).
    #[error("Invalid output buffer: {0}")]
    InvalidBuffer(&'static str),

    /// Operation not valid in the current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Two rows of a parameter table share an address.
    #[error("Duplicate parameter address: {0}")]
    DuplicateParameterAddress(ParameterAddress),

    /// A parameter table row has an empty range or an out-of-range default.
    #[error("Invalid range for parameter {0}")]
    InvalidParameterRange(ParameterAddress),

    /// A change observer is already installed for this address.
    #[error("Observer already installed for parameter {0}")]
    ObserverAlreadyInstalled(ParameterAddress),

    /// Preset index out of range.
    #[error("Unknown preset index: {0}")]
    UnknownPreset(usize),

    /// State serialization/deserialization error.
    #[error("State error: {0}")]
    StateError(String),
}

impl From<SourceError> for RenderError {
    fn from(err: SourceError) -> Self {
        Self::RenderFailed(err)
    }
}

impl From<FormatError> for RenderError {
    fn from(err: FormatError) -> Self {
        Self::UnsupportedFormat(err)
    }
}

/// Result type for render core operations.
pub type RenderResult<T> = Result<T, RenderError>;
