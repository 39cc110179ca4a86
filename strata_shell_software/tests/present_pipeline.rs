// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presenting frames through a recorded mock window and buffer queue.

use std::cell::RefCell;
use std::rc::Rc;

use peniko::{Brush, Color};
use strata_imaging::pixels::pack_rgb565;
use strata_imaging::{DrawOp, ImagingBackend, PaintDesc, PictureRecorder, RectF, StateOp};
use strata_shell_software::platform::{
    BufferFlushConfig, BufferRequestConfig, BufferUsage, Fence, QueueError, Rect,
    WindowRequestConfig,
};
use strata_shell_software::{
    BufferFormat, BufferQueue, FrameSize, PlatformWindow, PresentError, SoftwareSurface,
    SoftwareSurfaceConfig, SurfaceBuffer, SurfaceError, SurfaceState,
};

const SENTINEL: u8 = 0xAB;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reply {
    Buffer,
    Fail(i32),
    Null,
    ZeroSize,
}

#[derive(Debug)]
struct Flushed {
    pixels: Vec<u8>,
    fence: Fence,
    config: BufferFlushConfig,
}

#[derive(Debug)]
struct QueueLog {
    queue_sizes: Vec<u32>,
    requests: Vec<BufferRequestConfig>,
    flushes: Vec<Flushed>,
    reply: Reply,
    buffer_format: BufferFormat,
    refuse_queue_size: bool,
    flush_error: Option<i32>,
}

impl Default for QueueLog {
    fn default() -> Self {
        Self {
            queue_sizes: Vec::new(),
            requests: Vec::new(),
            flushes: Vec::new(),
            reply: Reply::Buffer,
            buffer_format: BufferFormat::RGBA_8888,
            refuse_queue_size: false,
            flush_error: None,
        }
    }
}

#[derive(Debug)]
struct MockBuffer {
    format: BufferFormat,
    data: Vec<u8>,
}

impl SurfaceBuffer for MockBuffer {
    fn format(&self) -> BufferFormat {
        self.format
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[derive(Clone, Debug, Default)]
struct MockQueue(Rc<RefCell<QueueLog>>);

impl BufferQueue for MockQueue {
    type Buffer = MockBuffer;

    fn set_queue_size(&mut self, size: u32) -> Result<(), QueueError> {
        let mut log = self.0.borrow_mut();
        log.queue_sizes.push(size);
        if log.refuse_queue_size {
            Err(QueueError { code: -22 })
        } else {
            Ok(())
        }
    }

    fn request_buffer(
        &mut self,
        config: &BufferRequestConfig,
    ) -> Result<(Option<MockBuffer>, Fence), QueueError> {
        let mut log = self.0.borrow_mut();
        log.requests.push(*config);
        let bpp = if log.buffer_format == BufferFormat::RGB_565 { 2 } else { 4 };
        let stride = usize::try_from(config.width).unwrap() * bpp;
        let len = stride * usize::try_from(config.height).unwrap();
        match log.reply {
            Reply::Buffer => Ok((
                Some(MockBuffer {
                    format: log.buffer_format,
                    data: vec![SENTINEL; len],
                }),
                Fence::NONE,
            )),
            Reply::Fail(code) => Err(QueueError { code }),
            Reply::Null => Ok((None, Fence::NONE)),
            Reply::ZeroSize => Ok((
                Some(MockBuffer {
                    format: log.buffer_format,
                    data: Vec::new(),
                }),
                Fence::NONE,
            )),
        }
    }

    fn flush_buffer(
        &mut self,
        buffer: MockBuffer,
        fence: Fence,
        config: &BufferFlushConfig,
    ) -> Result<(), QueueError> {
        let mut log = self.0.borrow_mut();
        log.flushes.push(Flushed {
            pixels: buffer.data,
            fence,
            config: *config,
        });
        match log.flush_error {
            Some(code) => Err(QueueError { code }),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
struct MockWindow {
    width: i32,
    height: i32,
    queue: Option<MockQueue>,
}

impl PlatformWindow for MockWindow {
    type Queue = MockQueue;

    fn request_config(&self) -> WindowRequestConfig {
        WindowRequestConfig {
            width: self.width,
            height: self.height,
            format: BufferFormat::RGBA_8888,
        }
    }

    fn buffer_queue(&mut self) -> Option<MockQueue> {
        self.queue.clone()
    }
}

fn bound_surface(width: i32, height: i32) -> (SoftwareSurface<MockWindow>, Rc<RefCell<QueueLog>>) {
    init_logger();
    let queue = MockQueue::default();
    let log = Rc::clone(&queue.0);
    let mut surface = SoftwareSurface::new(SoftwareSurfaceConfig::default()).unwrap();
    surface
        .set_platform_window(Some(MockWindow {
            width,
            height,
            queue: Some(queue),
        }))
        .unwrap();
    (surface, log)
}

fn fill(backend: &mut impl ImagingBackend, color: Color, rect: RectF) {
    let paint = backend.create_paint(PaintDesc {
        brush: Brush::Solid(color),
    });
    backend.state(StateOp::SetPaint(paint));
    backend.draw(DrawOp::fill_rect(rect));
}

#[test]
fn binding_requests_a_queue_depth_of_five() {
    let (surface, log) = bound_surface(90, 10);
    assert_eq!(surface.state(), SurfaceState::Bound);
    assert_eq!(log.borrow().queue_sizes, [5]);
}

#[test]
fn allocation_uses_the_aligned_width_but_writes_the_requested_width() {
    let (mut surface, log) = bound_surface(90, 10);
    surface
        .acquire_backing_store(FrameSize::new(100, 100))
        .unwrap()
        .render(|b| fill(b, Color::WHITE, RectF::new(0.0, 0.0, 100.0, 100.0)));
    surface.present_backing_store().unwrap();

    let log = log.borrow();
    let request = log.requests[0];
    assert_eq!(request.width, 96, "90 rounded up to a multiple of 16");
    assert_eq!(request.height, 10);
    assert_eq!(request.stride_alignment, 8);
    assert_eq!(request.format, BufferFormat::RGBA_8888);
    assert_eq!(
        request.usage,
        BufferUsage::CPU_READ | BufferUsage::CPU_WRITE | BufferUsage::MEM_DMA
    );
    assert_eq!(request.timeout, 0);

    let flushed = &log.flushes[0];
    let stride = 96 * 4;
    for row in flushed.pixels.chunks_exact(stride) {
        assert!(
            row[..90 * 4].iter().all(|&b| b == 0xFF),
            "requested columns hold the frame"
        );
        assert!(
            row[90 * 4..].iter().all(|&b| b == SENTINEL),
            "padding columns are never written"
        );
    }
}

#[test]
fn flush_covers_the_requested_region_without_a_fence() {
    let (mut surface, log) = bound_surface(90, 10);
    surface
        .acquire_backing_store(FrameSize::new(90, 10))
        .unwrap();
    surface.present_backing_store().unwrap();

    let log = log.borrow();
    assert_eq!(log.flushes.len(), 1);
    let flushed = &log.flushes[0];
    assert_eq!(flushed.fence, Fence::NONE);
    assert_eq!(
        flushed.config.damage,
        Rect {
            x: 0,
            y: 0,
            w: 90,
            h: 10
        }
    );
    assert_eq!(flushed.config.timestamp, 0);
}

#[test]
fn present_without_a_backing_store_touches_no_queue() {
    let (mut surface, log) = bound_surface(32, 32);
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::NoBackingStore)
    );
    let log = log.borrow();
    assert!(log.requests.is_empty());
    assert!(log.flushes.is_empty());
}

#[test]
fn zero_size_buffers_fail_without_a_blit() {
    let (mut surface, log) = bound_surface(32, 32);
    log.borrow_mut().reply = Reply::ZeroSize;
    surface
        .acquire_backing_store(FrameSize::new(32, 32))
        .unwrap();
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::ZeroSizeBuffer)
    );
    assert!(log.borrow().flushes.is_empty());
}

#[test]
fn refused_and_null_buffer_requests_fail() {
    let (mut surface, log) = bound_surface(32, 32);
    surface
        .acquire_backing_store(FrameSize::new(32, 32))
        .unwrap();

    log.borrow_mut().reply = Reply::Fail(-12);
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::RequestFailed(QueueError { code: -12 }))
    );

    log.borrow_mut().reply = Reply::Null;
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::NullBuffer)
    );
    assert!(log.borrow().flushes.is_empty());

    log.borrow_mut().reply = Reply::Buffer;
    assert_eq!(
        surface.present_backing_store(),
        Ok(()),
        "a later frame succeeds"
    );
}

#[test]
fn unsupported_buffer_formats_skip_the_copy_but_flush() {
    let (mut surface, log) = bound_surface(16, 4);
    log.borrow_mut().buffer_format = BufferFormat(999);
    surface
        .acquire_backing_store(FrameSize::new(16, 4))
        .unwrap()
        .render(|b| fill(b, Color::WHITE, RectF::new(0.0, 0.0, 16.0, 4.0)));
    assert_eq!(surface.present_backing_store(), Ok(()));

    let log = log.borrow();
    assert_eq!(log.flushes.len(), 1);
    assert!(log.flushes[0].pixels.iter().all(|&b| b == SENTINEL));
}

#[test]
fn rgb565_buffers_receive_packed_pixels() {
    let (mut surface, log) = bound_surface(16, 2);
    log.borrow_mut().buffer_format = BufferFormat::RGB_565;
    surface
        .acquire_backing_store(FrameSize::new(16, 2))
        .unwrap()
        .render(|b| fill(b, Color::WHITE, RectF::new(0.0, 0.0, 16.0, 2.0)));
    surface.present_backing_store().unwrap();

    let log = log.borrow();
    let pixels = &log.flushes[0].pixels;
    assert_eq!(pixels.len(), 16 * 2 * 2);
    assert_eq!(&pixels[..2], &pack_rgb565(255, 255, 255));
}

#[test]
fn flush_failures_propagate() {
    let (mut surface, log) = bound_surface(16, 16);
    log.borrow_mut().flush_error = Some(-5);
    surface
        .acquire_backing_store(FrameSize::new(16, 16))
        .unwrap();
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::FlushFailed(QueueError { code: -5 }))
    );
    assert_eq!(log.borrow().flushes.len(), 1, "the flush was still issued");
}

#[test]
fn empty_window_requests_fail_before_allocation() {
    let (mut surface, log) = bound_surface(0, 10);
    surface.acquire_backing_store(FrameSize::new(4, 4)).unwrap();
    assert_eq!(
        surface.present_backing_store(),
        Err(PresentError::EmptyFrame {
            width: 0,
            height: 10
        })
    );
    assert!(log.borrow().requests.is_empty());
}

#[test]
fn backing_store_is_cached_per_size() {
    let (mut surface, _log) = bound_surface(100, 100);
    let (size, bigger) = (FrameSize::new(100, 100), FrameSize::new(200, 200));
    let first = surface.acquire_backing_store(size).unwrap().id();
    let again = surface.acquire_backing_store(size).unwrap().id();
    assert_eq!(first, again, "unchanged size reuses the surface");

    let resized = surface.acquire_backing_store(bigger).unwrap();
    assert_ne!(resized.id(), first);
    assert_eq!((resized.width(), resized.height()), (200, 200));
}

#[test]
fn null_window_and_missing_queue() {
    init_logger();
    let mut surface = SoftwareSurface::<MockWindow>::new(SoftwareSurfaceConfig::default()).unwrap();
    assert_eq!(
        surface.set_platform_window(None),
        Err(SurfaceError::NullWindow)
    );
    assert_eq!(surface.state(), SurfaceState::Uninitialized);

    assert_eq!(
        surface.set_platform_window(Some(MockWindow {
            width: 10,
            height: 10,
            queue: None,
        })),
        Err(SurfaceError::QueueUnavailable)
    );
    assert_eq!(surface.state(), SurfaceState::Invalid);
    assert_eq!(surface.present_backing_store(), Err(PresentError::Invalid));
}

#[test]
fn rejected_queue_depth_still_binds() {
    init_logger();
    let queue = MockQueue::default();
    queue.0.borrow_mut().refuse_queue_size = true;
    let mut surface = SoftwareSurface::new(SoftwareSurfaceConfig::default()).unwrap();
    surface
        .set_platform_window(Some(MockWindow {
            width: 8,
            height: 8,
            queue: Some(queue),
        }))
        .unwrap();
    assert!(surface.is_valid());
}

#[test]
fn recorded_pictures_reach_the_platform_buffer() {
    let (mut surface, log) = bound_surface(16, 16);
    let red = Color::from_rgb8(255, 0, 0);
    let mut recorder = PictureRecorder::new();
    let picture = recorder
        .record(RectF::new(0.0, 0.0, 16.0, 16.0), |c| {
            fill(c, red, RectF::new(0.0, 0.0, 8.0, 16.0));
        })
        .unwrap();

    surface
        .present_picture(FrameSize::new(16, 16), &picture)
        .unwrap();

    let log = log.borrow();
    let pixels = &log.flushes[0].pixels;
    let stride = 16 * 4;
    assert_eq!(&pixels[..4], &[255, 0, 0, 255], "left half is red");
    assert_eq!(
        &pixels[12 * 4..13 * 4],
        &[0, 0, 0, 0],
        "right half is clear"
    );
    assert_eq!(&pixels[stride * 15..stride * 15 + 4], &[255, 0, 0, 255]);
}
