//! Errors raised while building signal sources.
//!
//! All of these happen on the control thread (file loading, sample
//! validation) and surface to the engine as
//! [`RenderError::ResourceAllocationFailed`].

use std::path::PathBuf;

use basic_au_core::RenderError;
use thiserror::Error;

/// Signal source construction errors.
#[derive(Debug, Error)]
pub enum DspError {
    /// The audio file could not be opened or decoded.
    #[error("Failed to read WAV '{path}': {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// The audio file decoded to zero frames.
    #[error("Audio file '{0}' contains no samples")]
    EmptyFile(PathBuf),

    /// Integer sample width hound cannot scale.
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// A sample buffer was empty or had a non-positive sample rate.
    #[error("Invalid sample data: {0}")]
    InvalidSample(&'static str),
}

/// Result type for signal source construction.
pub type DspResult<T> = Result<T, DspError>;

impl From<DspError> for RenderError {
    fn from(err: DspError) -> Self {
        RenderError::ResourceAllocationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_allocation_failure() {
        let err: RenderError = DspError::EmptyFile(PathBuf::from("loop.wav")).into();
        assert_eq!(
            err,
            RenderError::ResourceAllocationFailed(
                "Audio file 'loop.wav' contains no samples".to_string()
            )
        );
    }
}
