//! Common types used throughout the render core.

// =============================================================================
// Render Limits
// =============================================================================
//
// The render core negotiates a fixed stereo layout. The frame ceiling bounds
// what a host may request as `maximumFramesToRender`; anything larger is
// refused during allocation rather than discovered on the render thread.
// =============================================================================

/// Channel count negotiated by every unit built on this core.
pub const CHANNEL_COUNT: usize = 2;

/// Default maximum frames per render call.
///
/// Matches the manual-rendering maximum the unit advertises to hosts.
pub const DEFAULT_MAX_FRAMES: u32 = 4096;

/// Upper bound accepted for a negotiated maximum frame count.
pub const MAX_FRAMES_LIMIT: u32 = 16384;

/// Default sample rate used before the host negotiates a format.
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Stable parameter identifier.
///
/// Audio Unit parameter addresses are 64-bit; the core keeps the same width
/// so addresses round-trip through the host unchanged.
pub type ParameterAddress = u64;

/// Plain parameter value in the parameter's own units.
pub type ParameterValue = f32;

/// Offset in frames relative to the first frame of the current render call.
pub type SampleOffset = u32;
