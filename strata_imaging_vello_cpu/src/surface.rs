// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU backing store: a render context plus an owned pixel store.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use strata_imaging::pixels::{AlphaType, ColorType, ImageInfo, PixelRect, PixmapMut, PixmapRef};
use strata_imaging::{ImagingBackend, Picture};
use vello_cpu::{Pixmap, RenderContext};

use crate::VelloCpuImagingBackend;

/// Process-unique identity of a [`RasterSurface`] allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Reasons a [`RasterSurface`] cannot be allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// Width or height is zero.
    ZeroSize,
    /// A dimension exceeds what the rasterizer can address.
    TooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The colour and alpha type combination cannot be stored.
    UnsupportedFormat {
        /// Requested colour type.
        color_type: ColorType,
        /// Requested alpha type.
        alpha_type: AlphaType,
    },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize => f.write_str("raster surface must not be empty"),
            Self::TooLarge { width, height } => write!(
                f,
                "raster surface of {width}x{height} exceeds {max}x{max}",
                max = u16::MAX
            ),
            Self::UnsupportedFormat {
                color_type,
                alpha_type,
            } => write!(
                f,
                "unsupported raster format {color_type:?} with {alpha_type:?} alpha"
            ),
        }
    }
}

impl core::error::Error for RasterError {}

/// A CPU raster surface the imaging IR can be drawn into.
///
/// Pixels are kept in the surface's own colour type with a tight row stride.
/// A fresh surface is fully transparent (all bytes zero).
pub struct RasterSurface {
    id: SurfaceId,
    info: ImageInfo,
    ctx: RenderContext,
    pixmap: Pixmap,
    premul: Vec<u8>,
    pixels: Vec<u8>,
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl RasterSurface {
    /// Allocate a surface described by `info`.
    pub fn new(info: ImageInfo) -> Result<Self, RasterError> {
        if info.is_empty() {
            return Err(RasterError::ZeroSize);
        }
        let (Ok(width), Ok(height)) = (u16::try_from(info.width), u16::try_from(info.height))
        else {
            return Err(RasterError::TooLarge {
                width: info.width,
                height: info.height,
            });
        };
        if info.color_type == ColorType::Rgb565 && info.alpha_type != AlphaType::Opaque {
            return Err(RasterError::UnsupportedFormat {
                color_type: info.color_type,
                alpha_type: info.alpha_type,
            });
        }

        let byte_size = info.min_row_bytes() * info.height as usize;
        let id = SurfaceId::next();
        log::debug!(
            "allocating raster surface {id:?}: {}x{} {:?}",
            info.width,
            info.height,
            info.color_type
        );
        Ok(Self {
            id,
            info,
            ctx: RenderContext::new(width, height),
            pixmap: Pixmap::new(width, height),
            premul: vec![0; usize::from(width) * usize::from(height) * 4],
            pixels: vec![0; byte_size],
        })
    }

    /// Identity of this allocation.
    #[inline]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Description of the stored pixels.
    #[inline]
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Render a frame: run `f` against a fresh backend, rasterize the result,
    /// and replace the stored pixels with it.
    pub fn render<R>(&mut self, f: impl FnOnce(&mut VelloCpuImagingBackend<'_>) -> R) -> R {
        log::trace!("rendering into raster surface {:?}", self.id);
        self.ctx.reset();
        let out = {
            let mut backend = VelloCpuImagingBackend::new(&mut self.ctx);
            let out = f(&mut backend);
            if backend.layer_depth() > 0 {
                log::warn!(
                    "{} layer(s) left open at end of frame",
                    backend.layer_depth()
                );
                while backend.layer_depth() > 0 {
                    backend.layer_pop();
                }
            }
            out
        };
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        self.store_pixmap();
        out
    }

    /// Render `picture` as a frame.
    pub fn draw_picture(&mut self, picture: &Picture) {
        self.render(|backend| picture.playback(backend));
    }

    /// Read-only view of the stored pixels.
    pub fn peek_pixels(&self) -> Option<PixmapRef<'_>> {
        PixmapRef::new(self.info, self.info.min_row_bytes(), &self.pixels).ok()
    }

    fn store_pixmap(&mut self) {
        for (dst, p) in self.premul.chunks_exact_mut(4).zip(self.pixmap.data()) {
            dst.copy_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        let premul_info = ImageInfo::new(
            self.info.width,
            self.info.height,
            ColorType::Rgba8888,
            AlphaType::Premul,
        );
        let row_bytes = self.info.min_row_bytes();
        let (Ok(src), Ok(mut dst)) = (
            PixmapRef::new(premul_info, premul_info.min_row_bytes(), &self.premul),
            PixmapMut::new(self.info, row_bytes, &mut self.pixels),
        ) else {
            log::error!(
                "raster surface {:?} has inconsistent pixel storage",
                self.id
            );
            return;
        };
        dst.draw_pixmap_rect(
            &src,
            PixelRect::new(0, 0, self.info.width, self.info.height),
        );
    }
}
