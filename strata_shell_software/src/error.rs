// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use strata_imaging_vello_cpu::RasterError;

use crate::format::BufferFormat;
use crate::platform::QueueError;

/// Errors from binding a [`SoftwareSurface`](crate::SoftwareSurface) or
/// preparing its backing store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// No window was supplied.
    #[error("no platform window supplied")]
    NullWindow,
    /// The window has no buffer queue.
    #[error("platform window has no buffer queue")]
    QueueUnavailable,
    /// The surface is not bound to a window.
    #[error("surface is not bound to a platform window")]
    NotBound,
    /// The configured target format has no pixel interpretation.
    #[error("unsupported target format {0:?}")]
    UnsupportedTargetFormat(BufferFormat),
    /// A configuration value is out of range.
    #[error("invalid surface configuration: {0}")]
    InvalidConfig(&'static str),
    /// The backing store could not be allocated.
    #[error("failed to allocate backing store")]
    BackingStore(#[from] RasterError),
    /// Presenting the frame failed.
    #[error("failed to present frame")]
    Present(#[from] PresentError),
}

/// Reasons a frame could not be handed to the compositor.
///
/// Any of these drops the current frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PresentError {
    /// The surface is not bound to a window.
    #[error("surface is not valid")]
    Invalid,
    /// No backing store has been acquired.
    #[error("no backing store to present")]
    NoBackingStore,
    /// The backing store pixels could not be read.
    #[error("backing store pixels are unavailable")]
    PixelsUnavailable,
    /// No buffer queue is bound.
    #[error("no buffer queue bound")]
    NoBufferQueue,
    /// The window requests an empty frame.
    #[error("window requests an empty {width}x{height} frame")]
    EmptyFrame {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },
    /// The queue refused the buffer request.
    #[error("buffer request failed")]
    RequestFailed(#[source] QueueError),
    /// The queue returned no buffer.
    #[error("buffer queue returned no buffer")]
    NullBuffer,
    /// The queue returned a buffer without memory.
    #[error("buffer queue returned a zero-size buffer")]
    ZeroSizeBuffer,
    /// The queue refused the flushed buffer.
    #[error("buffer flush failed")]
    FlushFailed(#[source] QueueError),
}

/// Returned when process-wide platform defaults are installed twice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("platform defaults are already initialized")]
pub struct DefaultsAlreadyInitialized;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn queue_failures_keep_their_source() {
        let err = PresentError::FlushFailed(QueueError { code: 7 });
        let source = err.source().expect("flush failure has a source");
        assert_eq!(source.to_string(), "buffer queue returned error code 7");
    }

    #[test]
    fn present_errors_convert_into_surface_errors() {
        let err: SurfaceError = PresentError::ZeroSizeBuffer.into();
        assert_eq!(err, SurfaceError::Present(PresentError::ZeroSizeBuffer));
        assert!(err.source().is_some());
    }
}
