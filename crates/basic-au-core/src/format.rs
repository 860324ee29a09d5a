//! Render format negotiated between host and unit.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::types::{CHANNEL_COUNT, DEFAULT_MAX_FRAMES, DEFAULT_SAMPLE_RATE, MAX_FRAMES_LIMIT};

/// Sample rate, channel count and render quantum ceiling.
///
/// Only known once the host negotiates it, which is why every real-time
/// sized allocation happens in `allocate` and never on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderFormat {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Number of output channels.
    pub channel_count: usize,
    /// Largest frame count the host may request in one render call.
    pub max_frames: u32,
}

impl RenderFormat {
    /// Create a format description.
    pub const fn new(sample_rate: f64, channel_count: usize, max_frames: u32) -> Self {
        Self {
            sample_rate,
            channel_count,
            max_frames,
        }
    }

    /// Stereo format at the given sample rate and frame ceiling.
    pub const fn stereo(sample_rate: f64, max_frames: u32) -> Self {
        Self::new(sample_rate, CHANNEL_COUNT, max_frames)
    }

    /// Check the format against what the core supports.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.channel_count != CHANNEL_COUNT {
            return Err(FormatError::ChannelCount {
                expected: CHANNEL_COUNT,
                actual: self.channel_count,
            });
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(FormatError::SampleRate(self.sample_rate));
        }
        if self.max_frames == 0 || self.max_frames > MAX_FRAMES_LIMIT {
            return Err(FormatError::MaxFrames {
                requested: self.max_frames,
                limit: MAX_FRAMES_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for RenderFormat {
    fn default() -> Self {
        Self::stereo(DEFAULT_SAMPLE_RATE, DEFAULT_MAX_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_valid() {
        let format = RenderFormat::default();
        assert_eq!(format.sample_rate, 44100.0);
        assert_eq!(format.channel_count, 2);
        assert_eq!(format.max_frames, 4096);
        assert!(format.validate().is_ok());
    }

    #[test]
    fn test_rejects_mono() {
        let format = RenderFormat::new(48000.0, 1, 512);
        assert_eq!(
            format.validate(),
            Err(FormatError::ChannelCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_rejects_bad_sample_rate_and_frames() {
        assert!(matches!(
            RenderFormat::stereo(0.0, 512).validate(),
            Err(FormatError::SampleRate(_))
        ));
        assert!(matches!(
            RenderFormat::stereo(f64::NAN, 512).validate(),
            Err(FormatError::SampleRate(_))
        ));
        assert!(matches!(
            RenderFormat::stereo(44100.0, 0).validate(),
            Err(FormatError::MaxFrames { .. })
        ));
        assert!(matches!(
            RenderFormat::stereo(44100.0, MAX_FRAMES_LIMIT + 1).validate(),
            Err(FormatError::MaxFrames { .. })
        ));
    }
}
