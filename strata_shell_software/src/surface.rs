// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::Infallible;
use core::fmt;

use strata_imaging::Picture;
use strata_imaging::pixels::{AlphaType, ColorType, ImageInfo, PixelRect, PixmapMut};
use strata_imaging_vello_cpu::RasterSurface;

use crate::config::SoftwareSurfaceConfig;
use crate::error::{PresentError, SurfaceError};
use crate::format::resolve_color_type;
use crate::platform::{
    BufferFlushConfig, BufferQueue, BufferRequestConfig, Fence, PlatformWindow, Rect,
    SurfaceBuffer, WindowRequestConfig,
};

/// Round `value` up to the next multiple of `alignment`.
///
/// Non-positive alignments leave `value` unchanged. Saturates at `i32::MAX`.
pub fn align_up(value: i32, alignment: i32) -> i32 {
    if alignment <= 0 {
        return value;
    }
    let rem = value.rem_euclid(alignment);
    if rem == 0 {
        value
    } else {
        value.saturating_add(alignment - rem)
    }
}

/// Size of a backing store in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Binding state of a [`SoftwareSurface`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// No window has been bound yet.
    Uninitialized,
    /// Bound to a window with a buffer queue.
    Bound,
    /// The last bound window had no buffer queue.
    Invalid,
}

/// Presents CPU-rendered frames into a platform window's buffer queue.
///
/// Frames are drawn into a cached [`RasterSurface`] from
/// [`acquire_backing_store`](Self::acquire_backing_store) and handed to the
/// compositor with [`present_backing_store`](Self::present_backing_store).
/// Each present checks out one platform buffer, copies the frame into it,
/// and flushes it back; no buffer outlives the call.
pub struct SoftwareSurface<W: PlatformWindow> {
    config: SoftwareSurfaceConfig,
    color_type: ColorType,
    alpha_type: AlphaType,
    state: SurfaceState,
    window: Option<W>,
    queue: Option<W::Queue>,
    request: Option<WindowRequestConfig>,
    backing_store: Option<RasterSurface>,
}

impl<W: PlatformWindow> fmt::Debug for SoftwareSurface<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareSurface")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("request", &self.request)
            .field("backing_store", &self.backing_store)
            .finish_non_exhaustive()
    }
}

impl<W: PlatformWindow> SoftwareSurface<W> {
    /// Create an unbound surface.
    pub fn new(config: SoftwareSurfaceConfig) -> Result<Self, SurfaceError> {
        config.validate()?;
        let Some((color_type, alpha_type)) = resolve_color_type(config.target_format) else {
            log::error!("unsupported target format {:?}", config.target_format);
            return Err(SurfaceError::UnsupportedTargetFormat(config.target_format));
        };
        Ok(Self {
            config,
            color_type,
            alpha_type,
            state: SurfaceState::Uninitialized,
            window: None,
            queue: None,
            request: None,
            backing_store: None,
        })
    }

    /// The negotiation settings.
    pub fn config(&self) -> &SoftwareSurfaceConfig {
        &self.config
    }

    /// Current binding state.
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Returns `true` when bound to a window with a buffer queue.
    pub fn is_valid(&self) -> bool {
        self.state == SurfaceState::Bound
    }

    /// The bound window.
    pub fn window(&self) -> Option<&W> {
        self.window.as_ref()
    }

    /// Geometry captured from the window at bind time.
    pub fn request_config(&self) -> Option<WindowRequestConfig> {
        self.request
    }

    /// The cached backing store, if one has been acquired.
    pub fn backing_store(&self) -> Option<&RasterSurface> {
        self.backing_store.as_ref()
    }

    /// Bind to `window`.
    ///
    /// `None` is rejected and leaves the surface as it was. A window without
    /// a buffer queue leaves the surface [`Invalid`](SurfaceState::Invalid).
    pub fn set_platform_window(&mut self, window: Option<W>) -> Result<(), SurfaceError> {
        let Some(mut window) = window else {
            log::error!("set_platform_window called without a window");
            return Err(SurfaceError::NullWindow);
        };
        let request = window.request_config();
        let Some(mut queue) = window.buffer_queue() else {
            log::error!("platform window has no buffer queue");
            self.window = Some(window);
            self.queue = None;
            self.request = Some(request);
            self.state = SurfaceState::Invalid;
            return Err(SurfaceError::QueueUnavailable);
        };
        if let Err(err) = queue.set_queue_size(self.config.buffer_queue_size) {
            log::warn!(
                "failed to set buffer queue size to {}: {err}",
                self.config.buffer_queue_size
            );
        }
        log::debug!(
            "bound to platform window requesting {}x{}",
            request.width,
            request.height
        );
        self.window = Some(window);
        self.queue = Some(queue);
        self.request = Some(request);
        self.state = SurfaceState::Bound;
        Ok(())
    }

    /// A backing store of exactly `size`.
    ///
    /// The cached store is returned unchanged when its dimensions match;
    /// otherwise it is dropped and a new one is allocated in the target
    /// format.
    pub fn acquire_backing_store(
        &mut self,
        size: FrameSize,
    ) -> Result<&mut RasterSurface, SurfaceError> {
        if !self.is_valid() {
            return Err(SurfaceError::NotBound);
        }
        let store = match self.backing_store.take() {
            Some(store) if store.width() == size.width && store.height() == size.height => store,
            old => {
                if let Some(old) = &old {
                    log::debug!(
                        "releasing {}x{} backing store {:?}",
                        old.width(),
                        old.height(),
                        old.id()
                    );
                }
                drop(old);
                RasterSurface::new(ImageInfo::new(
                    size.width,
                    size.height,
                    self.color_type,
                    self.alpha_type,
                ))?
            }
        };
        Ok(self.backing_store.insert(store))
    }

    /// Hand the backing store to the compositor.
    ///
    /// On failure the frame is dropped; retrying is up to the caller.
    pub fn present_backing_store(&mut self) -> Result<(), PresentError> {
        log::trace!("present_backing_store");
        if !self.is_valid() {
            log::error!("present on a surface in state {:?}", self.state);
            return Err(PresentError::Invalid);
        }
        let Some(store) = self.backing_store.as_ref() else {
            log::error!("present without a backing store");
            return Err(PresentError::NoBackingStore);
        };
        let Some(src) = store.peek_pixels() else {
            log::error!("could not read pixels of backing store {:?}", store.id());
            return Err(PresentError::PixelsUnavailable);
        };
        let (Some(queue), Some(request)) = (self.queue.as_mut(), self.request) else {
            log::error!("present without a buffer queue");
            return Err(PresentError::NoBufferQueue);
        };
        let (width, height) = (request.width, request.height);
        if width <= 0 || height <= 0 {
            log::error!("window requests an empty {width}x{height} frame");
            return Err(PresentError::EmptyFrame { width, height });
        }

        let aligned_width = align_up(width, self.config.width_alignment);
        let request_config = BufferRequestConfig {
            width: aligned_width,
            height,
            stride_alignment: self.config.stride_alignment,
            format: self.config.request_format,
            usage: self.config.usage,
            timeout: self.config.timeout,
        };
        let (buffer, _fence) = queue.request_buffer(&request_config).map_err(|err| {
            log::error!("buffer request of {aligned_width}x{height} failed: {err}");
            PresentError::RequestFailed(err)
        })?;
        let Some(mut buffer) = buffer else {
            log::error!("buffer queue returned no buffer");
            return Err(PresentError::NullBuffer);
        };
        let size = buffer.size();
        if size == 0 {
            log::error!("buffer queue returned a zero-size buffer");
            return Err(PresentError::ZeroSizeBuffer);
        }

        let (frame_width, frame_height) = (width.unsigned_abs(), height.unsigned_abs());
        let format = buffer.format();
        match resolve_color_type(format) {
            Some((color_type, alpha_type)) => {
                let info = ImageInfo::new(frame_width, frame_height, color_type, alpha_type);
                let row_bytes = size / frame_height as usize;
                match PixmapMut::new(info, row_bytes, buffer.pixels_mut()) {
                    Ok(mut dst) => {
                        dst.draw_pixmap_rect(&src, PixelRect::new(0, 0, frame_width, frame_height))
                    }
                    Err(err) => log::warn!("cannot write into platform buffer: {err}"),
                }
            }
            None => log::warn!("unsupported buffer format {format:?}, skipping copy"),
        }

        let flush_config = BufferFlushConfig {
            damage: Rect {
                x: 0,
                y: 0,
                w: width,
                h: height,
            },
            timestamp: 0,
        };
        queue
            .flush_buffer(buffer, Fence::NONE, &flush_config)
            .map_err(|err| {
                log::error!("buffer flush failed: {err}");
                PresentError::FlushFailed(err)
            })?;
        log::trace!("presented {width}x{height} frame");
        Ok(())
    }

    /// Draw `picture` into a backing store of `size` and present it.
    pub fn present_picture(
        &mut self,
        size: FrameSize,
        picture: &Picture,
    ) -> Result<(), SurfaceError> {
        self.acquire_backing_store(size)?.draw_picture(picture);
        self.present_backing_store()?;
        Ok(())
    }

    /// Platform view embedding; software surfaces never provide one.
    pub fn external_view_embedder(&self) -> Option<Infallible> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::BufferFormat;
    use crate::platform::QueueError;

    #[derive(Debug)]
    struct Buffer(Vec<u8>);

    impl SurfaceBuffer for Buffer {
        fn format(&self) -> BufferFormat {
            BufferFormat::RGBA_8888
        }

        fn size(&self) -> usize {
            self.0.len()
        }

        fn pixels_mut(&mut self) -> &mut [u8] {
            &mut self.0
        }
    }

    #[derive(Debug, Default)]
    struct Queue {
        sizes: Vec<u32>,
        refuse_size: bool,
    }

    impl BufferQueue for Queue {
        type Buffer = Buffer;

        fn set_queue_size(&mut self, size: u32) -> Result<(), QueueError> {
            self.sizes.push(size);
            if self.refuse_size {
                Err(QueueError { code: -1 })
            } else {
                Ok(())
            }
        }

        fn request_buffer(
            &mut self,
            config: &BufferRequestConfig,
        ) -> Result<(Option<Buffer>, Fence), QueueError> {
            let len = usize::try_from(config.width * config.height * 4).unwrap();
            Ok((Some(Buffer(vec![0; len])), Fence::NONE))
        }

        fn flush_buffer(
            &mut self,
            _buffer: Buffer,
            _fence: Fence,
            _config: &BufferFlushConfig,
        ) -> Result<(), QueueError> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Window {
        queue: Option<Queue>,
    }

    impl Window {
        fn with_queue(queue: Queue) -> Self {
            Self { queue: Some(queue) }
        }
    }

    impl PlatformWindow for Window {
        type Queue = Queue;

        fn request_config(&self) -> WindowRequestConfig {
            WindowRequestConfig {
                width: 8,
                height: 8,
                format: BufferFormat::RGBA_8888,
            }
        }

        fn buffer_queue(&mut self) -> Option<Queue> {
            self.queue.take()
        }
    }

    fn surface() -> SoftwareSurface<Window> {
        SoftwareSurface::new(SoftwareSurfaceConfig::default()).unwrap()
    }

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(90, 16), 96);
        assert_eq!(align_up(96, 16), 96);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(17, 0), 17);
        assert_eq!(align_up(i32::MAX, 16), i32::MAX);
    }

    #[test]
    fn new_surfaces_are_unbound() {
        let surface = surface();
        assert_eq!(surface.state(), SurfaceState::Uninitialized);
        assert!(!surface.is_valid());
        assert!(surface.external_view_embedder().is_none());
    }

    #[test]
    fn unsupported_target_format_is_rejected() {
        let config = SoftwareSurfaceConfig::default().with_target_format(BufferFormat(999));
        assert_eq!(
            SoftwareSurface::<Window>::new(config).unwrap_err(),
            SurfaceError::UnsupportedTargetFormat(BufferFormat(999))
        );
    }

    #[test]
    fn null_window_leaves_state_unchanged() {
        let mut surface = surface();
        assert_eq!(
            surface.set_platform_window(None),
            Err(SurfaceError::NullWindow)
        );
        assert_eq!(surface.state(), SurfaceState::Uninitialized);

        surface
            .set_platform_window(Some(Window::with_queue(Queue::default())))
            .unwrap();
        assert_eq!(
            surface.set_platform_window(None),
            Err(SurfaceError::NullWindow)
        );
        assert_eq!(
            surface.state(),
            SurfaceState::Bound,
            "still bound after a null window"
        );
    }

    #[test]
    fn binding_sets_the_queue_size() {
        let mut surface = surface();
        surface
            .set_platform_window(Some(Window::with_queue(Queue::default())))
            .unwrap();
        assert!(surface.is_valid());
        assert_eq!(surface.queue.as_ref().unwrap().sizes, [5]);
        assert_eq!(surface.request_config().map(|r| r.width), Some(8));
    }

    #[test]
    fn missing_queue_invalidates() {
        let mut surface = surface();
        assert_eq!(
            surface.set_platform_window(Some(Window { queue: None })),
            Err(SurfaceError::QueueUnavailable)
        );
        assert_eq!(surface.state(), SurfaceState::Invalid);
        assert!(!surface.is_valid());
        assert_eq!(
            surface
                .acquire_backing_store(FrameSize::new(4, 4))
                .unwrap_err(),
            SurfaceError::NotBound
        );
        assert_eq!(surface.present_backing_store(), Err(PresentError::Invalid));
    }

    #[test]
    fn rejected_queue_size_is_tolerated() {
        let mut surface = surface();
        let queue = Queue {
            refuse_size: true,
            ..Queue::default()
        };
        surface
            .set_platform_window(Some(Window::with_queue(queue)))
            .unwrap();
        assert!(surface.is_valid());
    }

    #[test]
    fn backing_store_is_reused_for_equal_sizes() {
        let mut surface = surface();
        surface
            .set_platform_window(Some(Window::with_queue(Queue::default())))
            .unwrap();
        let (size, bigger) = (FrameSize::new(100, 100), FrameSize::new(200, 200));
        let first = surface.acquire_backing_store(size).unwrap().id();
        let second = surface.acquire_backing_store(size).unwrap().id();
        assert_eq!(first, second);

        let resized = surface.acquire_backing_store(bigger).unwrap();
        assert_ne!(resized.id(), first);
        assert_eq!((resized.width(), resized.height()), (200, 200));
    }

    #[test]
    fn allocation_failures_surface_as_errors() {
        let mut surface = surface();
        surface
            .set_platform_window(Some(Window::with_queue(Queue::default())))
            .unwrap();
        assert!(matches!(
            surface.acquire_backing_store(FrameSize::new(0, 10)),
            Err(SurfaceError::BackingStore(_))
        ));
        assert!(surface.backing_store().is_none());
    }

    #[test]
    fn present_without_backing_store_fails() {
        let mut surface = surface();
        surface
            .set_platform_window(Some(Window::with_queue(Queue::default())))
            .unwrap();
        assert_eq!(
            surface.present_backing_store(),
            Err(PresentError::NoBackingStore)
        );
    }
}
