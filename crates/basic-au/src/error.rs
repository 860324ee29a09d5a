//! OSStatus codes and the mapping from render core errors.
//!
//! Everything above the render block speaks [`RenderError`]. Hosts only see
//! the 32-bit status returned from the render block, so each error kind maps
//! to the Audio Unit code a host expects for it.

use basic_au_core::RenderError;

/// OSStatus error codes commonly used in Audio Unit.
pub mod os_status {
    /// No error.
    pub const NO_ERR: i32 = 0;

    /// Invalid property value.
    pub const INVALID_PROPERTY_VALUE: i32 = -10851;

    /// Invalid parameter.
    pub const INVALID_PARAMETER: i32 = -10878;

    /// Render operation failed.
    pub const RENDER: i32 = -10877;

    /// Too many frames to process.
    pub const TOO_MANY_FRAMES_TO_PROCESS: i32 = -10874;

    /// Invalid file.
    pub const INVALID_FILE: i32 = -10871;

    /// Format not supported.
    pub const FORMAT_NOT_SUPPORTED: i32 = -10868;

    /// Uninitialized.
    pub const UNINITIALIZED: i32 = -10867;

    /// Cannot do in current context.
    pub const CANNOT_DO_IN_CURRENT_CONTEXT: i32 = -10863;

    /// Generic bad-argument error (`paramErr`).
    pub const PARAM_ERR: i32 = -50;
}

/// OSStatus a host receives for `error`.
pub fn to_os_status(error: &RenderError) -> i32 {
    match error {
        RenderError::UnsupportedFormat(_) => os_status::FORMAT_NOT_SUPPORTED,
        RenderError::InvalidParameterAddress(_)
        | RenderError::DuplicateParameterAddress(_)
        | RenderError::InvalidParameterRange(_)
        | RenderError::ObserverAlreadyInstalled(_) => os_status::INVALID_PARAMETER,
        RenderError::BufferOverrun { .. } => os_status::TOO_MANY_FRAMES_TO_PROCESS,
        RenderError::RenderFailed(_) => os_status::RENDER,
        RenderError::ResourceAllocationFailed(_) => os_status::INVALID_FILE,
        RenderError::InvalidState(_) => os_status::UNINITIALIZED,
        RenderError::InvalidBuffer(_) => os_status::PARAM_ERR,
        RenderError::UnknownPreset(_) | RenderError::StateError(_) => {
            os_status::INVALID_PROPERTY_VALUE
        }
    }
}

/// Collapse a render result into an OSStatus.
#[inline]
pub fn status_of(result: &Result<(), RenderError>) -> i32 {
    match result {
        Ok(()) => os_status::NO_ERR,
        Err(error) => to_os_status(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic_au_core::{FormatError, SourceError};

    #[test]
    fn test_render_errors_map_to_au_codes() {
        assert_eq!(
            to_os_status(&RenderError::BufferOverrun {
                requested: 8192,
                maximum: 4096
            }),
            os_status::TOO_MANY_FRAMES_TO_PROCESS
        );
        assert_eq!(
            to_os_status(&RenderError::InvalidState("not allocated")),
            os_status::UNINITIALIZED
        );
        assert_eq!(
            to_os_status(&RenderError::RenderFailed(SourceError::NotPrepared)),
            os_status::RENDER
        );
        assert_eq!(
            to_os_status(&RenderError::UnsupportedFormat(FormatError::SampleRate(0.0))),
            os_status::FORMAT_NOT_SUPPORTED
        );
        assert_eq!(
            to_os_status(&RenderError::InvalidParameterAddress(7)),
            os_status::INVALID_PARAMETER
        );
    }

    #[test]
    fn test_host_buffer_faults_are_not_lifecycle_errors() {
        let status = to_os_status(&RenderError::InvalidBuffer("null output buffer list"));
        assert_eq!(status, os_status::PARAM_ERR);
        assert_ne!(status, os_status::UNINITIALIZED);
    }

    #[test]
    fn test_status_of_ok() {
        assert_eq!(status_of(&Ok(())), os_status::NO_ERR);
        assert_eq!(
            status_of(&Err(RenderError::UnknownPreset(4))),
            os_status::INVALID_PROPERTY_VALUE
        );
    }
}
