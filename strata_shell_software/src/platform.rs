// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam between the software surface and the platform windowing system.
//!
//! A [`PlatformWindow`] hands out its [`BufferQueue`]. Each frame, one
//! [`SurfaceBuffer`] is requested from the queue, written through
//! [`SurfaceBuffer::pixels_mut`], and moved back into the queue by
//! [`BufferQueue::flush_buffer`]. Buffers are never kept across frames.

use bitflags::bitflags;

use crate::format::BufferFormat;

bitflags! {
    /// How a requested buffer will be accessed.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u64 {
        /// The CPU reads from the buffer.
        const CPU_READ = 1 << 0;
        /// The CPU writes to the buffer.
        const CPU_WRITE = 1 << 1;
        /// Memory comes from the media memory zone.
        const MEM_MMZ = 1 << 2;
        /// Memory is DMA-capable and shareable with the compositor.
        const MEM_DMA = 1 << 3;
    }
}

/// Integer rectangle used for damage regions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

/// Synchronization fence accompanying a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fence(pub i32);

impl Fence {
    /// No fence; the buffer is ready immediately.
    pub const NONE: Self = Self(-1);
}

/// Geometry and format the window asks its producer to render at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowRequestConfig {
    /// Requested frame width in pixels.
    pub width: i32,
    /// Requested frame height in pixels.
    pub height: i32,
    /// Preferred buffer format.
    pub format: BufferFormat,
}

/// Parameters for [`BufferQueue::request_buffer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferRequestConfig {
    /// Allocation width in pixels.
    pub width: i32,
    /// Allocation height in pixels.
    pub height: i32,
    /// Row stride alignment in bytes.
    pub stride_alignment: i32,
    /// Pixel format of the buffer.
    pub format: BufferFormat,
    /// Intended access.
    pub usage: BufferUsage,
    /// Milliseconds to wait for a free buffer; zero does not wait.
    pub timeout: i32,
}

/// Parameters for [`BufferQueue::flush_buffer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferFlushConfig {
    /// Region of the buffer that changed.
    pub damage: Rect,
    /// Presentation timestamp; zero means none.
    pub timestamp: i64,
}

/// Failure status returned by a buffer queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("buffer queue returned error code {code}")]
pub struct QueueError {
    /// Platform status code.
    pub code: i32,
}

/// A pixel buffer checked out from a [`BufferQueue`].
pub trait SurfaceBuffer {
    /// Pixel format the buffer was allocated with.
    fn format(&self) -> BufferFormat;

    /// Total size of the buffer memory in bytes.
    fn size(&self) -> usize;

    /// The buffer memory. Valid until the buffer is flushed.
    fn pixels_mut(&mut self) -> &mut [u8];
}

/// A window's queue of buffers shared with the compositor.
pub trait BufferQueue {
    /// Buffers handed out by this queue.
    type Buffer: SurfaceBuffer;

    /// Set how many buffers may be in flight at once.
    fn set_queue_size(&mut self, size: u32) -> Result<(), QueueError>;

    /// Check out a buffer. `Ok((None, _))` means the queue had nothing to give.
    fn request_buffer(
        &mut self,
        config: &BufferRequestConfig,
    ) -> Result<(Option<Self::Buffer>, Fence), QueueError>;

    /// Return a written buffer to the queue for display.
    fn flush_buffer(
        &mut self,
        buffer: Self::Buffer,
        fence: Fence,
        config: &BufferFlushConfig,
    ) -> Result<(), QueueError>;
}

/// A native window a software surface presents into.
pub trait PlatformWindow {
    /// The window's buffer queue type.
    type Queue: BufferQueue;

    /// Geometry the window wants frames rendered at.
    fn request_config(&self) -> WindowRequestConfig;

    /// The window's buffer queue, if it has one.
    fn buffer_queue(&mut self) -> Option<Self::Queue>;
}
