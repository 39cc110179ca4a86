// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::error::SurfaceError;
use crate::format::BufferFormat;
use crate::platform::BufferUsage;

/// Buffer negotiation settings for a [`SoftwareSurface`](crate::SoftwareSurface).
///
/// The defaults keep enough buffers in flight that the render thread does not
/// stall while the compositor displays older frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SoftwareSurfaceConfig {
    /// Number of buffers the window's queue may have in flight.
    pub buffer_queue_size: u32,
    /// Allocation width is rounded up to a multiple of this.
    pub width_alignment: i32,
    /// Row stride alignment passed to the allocator, in bytes.
    pub stride_alignment: i32,
    /// Format requested for platform buffers.
    pub request_format: BufferFormat,
    /// Format of the backing store.
    pub target_format: BufferFormat,
    /// Access flags for requested buffers.
    pub usage: BufferUsage,
    /// Buffer request timeout in milliseconds.
    pub timeout: i32,
}

impl Default for SoftwareSurfaceConfig {
    fn default() -> Self {
        Self {
            buffer_queue_size: 5,
            width_alignment: 16,
            stride_alignment: 8,
            request_format: BufferFormat::RGBA_8888,
            target_format: BufferFormat::RGBA_8888,
            usage: BufferUsage::CPU_READ | BufferUsage::CPU_WRITE | BufferUsage::MEM_DMA,
            timeout: 0,
        }
    }
}

impl SoftwareSurfaceConfig {
    /// Set the buffer queue depth.
    #[must_use]
    pub fn with_buffer_queue_size(mut self, size: u32) -> Self {
        self.buffer_queue_size = size;
        self
    }

    /// Set the allocation width alignment.
    #[must_use]
    pub fn with_width_alignment(mut self, alignment: i32) -> Self {
        self.width_alignment = alignment;
        self
    }

    /// Set the row stride alignment.
    #[must_use]
    pub fn with_stride_alignment(mut self, alignment: i32) -> Self {
        self.stride_alignment = alignment;
        self
    }

    /// Set the backing store format.
    #[must_use]
    pub fn with_target_format(mut self, format: BufferFormat) -> Self {
        self.target_format = format;
        self
    }

    /// Set the buffer request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: i32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), SurfaceError> {
        if self.buffer_queue_size == 0 {
            return Err(SurfaceError::InvalidConfig("buffer queue size must be positive"));
        }
        if self.width_alignment <= 0 {
            return Err(SurfaceError::InvalidConfig("width alignment must be positive"));
        }
        if self.stride_alignment <= 0 {
            return Err(SurfaceError::InvalidConfig("stride alignment must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_constants() {
        let config = SoftwareSurfaceConfig::default();
        assert_eq!(config.buffer_queue_size, 5);
        assert_eq!(config.width_alignment, 16);
        assert_eq!(config.stride_alignment, 8);
        assert_eq!(config.request_format, BufferFormat::RGBA_8888);
        assert_eq!(config.usage.bits(), 0b1011);
        assert_eq!(config.timeout, 0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_non_positive_values() {
        let base = SoftwareSurfaceConfig::default();
        assert!(base.with_buffer_queue_size(0).validate().is_err());
        assert!(base.with_width_alignment(0).validate().is_err());
        assert!(base.with_stride_alignment(-8).validate().is_err());
        assert!(base.with_timeout(100).validate().is_ok());
    }
}
