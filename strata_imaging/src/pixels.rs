// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats and borrowed pixmap views.
//!
//! [`PixmapRef`] and [`PixmapMut`] wrap memory owned elsewhere (a backing
//! store, or a buffer handed out by a platform queue) together with an
//! [`ImageInfo`] and a row stride. [`PixmapMut::draw_pixmap_rect`] copies one
//! view into another, scaling with nearest-neighbour sampling and converting
//! between colour and alpha types on the way.

use core::fmt;

/// Memory layout of a single pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// Four 8-bit channels in R, G, B, A byte order.
    Rgba8888,
    /// 16-bit little-endian pixel: 5 bits red (high), 6 bits green, 5 bits blue (low).
    Rgb565,
}

impl ColorType {
    /// Number of bytes one pixel occupies.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8888 => 4,
            Self::Rgb565 => 2,
        }
    }
}

/// How the alpha channel is to be interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlphaType {
    /// Every pixel is fully opaque; any stored alpha is ignored.
    Opaque,
    /// Colour channels are premultiplied by alpha.
    Premul,
    /// Colour channels are stored independently of alpha.
    Unpremul,
}

/// Colour space of the pixel values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// The standard RGB working space.
    #[default]
    Srgb,
}

/// Dimensions and format of a block of pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Per-pixel memory layout.
    pub color_type: ColorType,
    /// Interpretation of the alpha channel.
    pub alpha_type: AlphaType,
    /// Colour space of the pixel values.
    pub color_space: ColorSpace,
}

impl ImageInfo {
    /// Create an sRGB image description.
    #[inline]
    pub const fn new(
        width: u32,
        height: u32,
        color_type: ColorType,
        alpha_type: AlphaType,
    ) -> Self {
        Self {
            width,
            height,
            color_type,
            alpha_type,
            color_space: ColorSpace::Srgb,
        }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest valid row stride in bytes.
    #[inline]
    pub const fn min_row_bytes(&self) -> usize {
        self.width as usize * self.color_type.bytes_per_pixel()
    }

    /// Number of bytes needed to hold the image with the given stride.
    ///
    /// The last row only needs `min_row_bytes`. Returns `None` on overflow.
    pub fn compute_byte_size(&self, row_bytes: usize) -> Option<usize> {
        if self.height == 0 {
            return Some(0);
        }
        row_bytes
            .checked_mul(self.height as usize - 1)?
            .checked_add(self.min_row_bytes())
    }
}

/// Integer rectangle in pixel coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Create a rectangle from an origin and a size.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Reasons a pixmap view cannot be created.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixmapError {
    /// Row stride is smaller than one row of pixels.
    RowBytesTooSmall {
        /// Stride that was supplied.
        row_bytes: usize,
        /// Minimum stride for the image width.
        min_row_bytes: usize,
    },
    /// The memory block is shorter than the image requires.
    DataTooShort {
        /// Length of the supplied memory.
        len: usize,
        /// Bytes required by the image.
        needed: usize,
    },
    /// The image size overflows the address space.
    SizeOverflow,
}

impl fmt::Display for PixmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowBytesTooSmall {
                row_bytes,
                min_row_bytes,
            } => write!(
                f,
                "row stride of {row_bytes} bytes is below the minimum of {min_row_bytes}"
            ),
            Self::DataTooShort { len, needed } => {
                write!(f, "pixel memory holds {len} bytes but {needed} are needed")
            }
            Self::SizeOverflow => f.write_str("image size overflows"),
        }
    }
}

impl core::error::Error for PixmapError {}

fn validate(info: &ImageInfo, row_bytes: usize, len: usize) -> Result<(), PixmapError> {
    let min_row_bytes = info.min_row_bytes();
    if row_bytes < min_row_bytes {
        return Err(PixmapError::RowBytesTooSmall {
            row_bytes,
            min_row_bytes,
        });
    }
    let needed = info
        .compute_byte_size(row_bytes)
        .ok_or(PixmapError::SizeOverflow)?;
    if len < needed {
        return Err(PixmapError::DataTooShort { len, needed });
    }
    Ok(())
}

/// Read-only view over pixels owned elsewhere.
#[derive(Copy, Clone, Debug)]
pub struct PixmapRef<'a> {
    info: ImageInfo,
    row_bytes: usize,
    data: &'a [u8],
}

impl<'a> PixmapRef<'a> {
    /// Wrap `data` as pixels described by `info` with the given row stride.
    pub fn new(info: ImageInfo, row_bytes: usize, data: &'a [u8]) -> Result<Self, PixmapError> {
        validate(&info, row_bytes, data.len())?;
        Ok(Self {
            info,
            row_bytes,
            data,
        })
    }

    /// Description of the pixels.
    #[inline]
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Row stride in bytes.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// The underlying memory.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a pixel as premultiplied RGBA8.
    ///
    /// Returns `None` outside the image.
    pub fn premul_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let bpp = self.info.color_type.bytes_per_pixel();
        let at = y as usize * self.row_bytes + x as usize * bpp;
        Some(decode(
            self.info.color_type,
            self.info.alpha_type,
            &self.data[at..at + bpp],
        ))
    }
}

/// Writable view over pixels owned elsewhere.
#[derive(Debug)]
pub struct PixmapMut<'a> {
    info: ImageInfo,
    row_bytes: usize,
    data: &'a mut [u8],
}

impl<'a> PixmapMut<'a> {
    /// Wrap `data` as pixels described by `info` with the given row stride.
    pub fn new(info: ImageInfo, row_bytes: usize, data: &'a mut [u8]) -> Result<Self, PixmapError> {
        validate(&info, row_bytes, data.len())?;
        Ok(Self {
            info,
            row_bytes,
            data,
        })
    }

    /// Description of the pixels.
    #[inline]
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Row stride in bytes.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Reborrow as a read-only view.
    #[inline]
    pub fn as_pixmap_ref(&self) -> PixmapRef<'_> {
        PixmapRef {
            info: self.info,
            row_bytes: self.row_bytes,
            data: self.data,
        }
    }

    /// Copy `src` into `dst` with nearest-neighbour scaling.
    ///
    /// Destination pixels are replaced, not blended. The part of `dst` that
    /// falls outside this pixmap is ignored; nothing outside `dst` is written.
    pub fn draw_pixmap_rect(&mut self, src: &PixmapRef<'_>, dst: PixelRect) {
        if dst.is_empty() || src.info.is_empty() {
            return;
        }
        let src_w = u64::from(src.info.width);
        let src_h = u64::from(src.info.height);
        let dst_w = u64::from(dst.width);
        let dst_h = u64::from(dst.height);
        let x_end = dst.x.saturating_add(dst.width).min(self.info.width);
        let y_end = dst.y.saturating_add(dst.height).min(self.info.height);
        let bpp = self.info.color_type.bytes_per_pixel();

        for y in dst.y..y_end {
            let dy = u64::from(y - dst.y);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "sample row is below the source height, which is a u32"
            )]
            let sy = (((2 * dy + 1) * src_h) / (2 * dst_h)) as u32;
            let row = y as usize * self.row_bytes;
            for x in dst.x..x_end {
                let dx = u64::from(x - dst.x);
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "sample column is below the source width, which is a u32"
                )]
                let sx = (((2 * dx + 1) * src_w) / (2 * dst_w)) as u32;
                let Some(px) = src.premul_rgba(sx, sy) else {
                    continue;
                };
                let at = row + x as usize * bpp;
                encode(
                    self.info.color_type,
                    self.info.alpha_type,
                    px,
                    &mut self.data[at..at + bpp],
                );
            }
        }
    }
}

/// Premultiply one 8-bit channel by an 8-bit alpha, rounding to nearest.
#[inline]
pub fn premultiply(c: u8, a: u8) -> u8 {
    #[expect(clippy::cast_possible_truncation, reason = "result is at most 255")]
    let out = ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
    out
}

/// Undo [`premultiply`], rounding to nearest. Fully transparent pixels map to zero.
#[inline]
pub fn unpremultiply(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let a = u32::from(a);
    ((u32::from(c) * 255 + a / 2) / a).min(255) as u8
}

/// Pack premultiplied RGB into a little-endian RGB565 pixel.
#[inline]
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> [u8; 2] {
    let v = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
    v.to_le_bytes()
}

/// Expand a little-endian RGB565 pixel to 8-bit RGB by bit replication.
#[inline]
pub fn unpack_rgb565(bytes: [u8; 2]) -> [u8; 3] {
    let v = u16::from_le_bytes(bytes);
    let (r, g, b) = ((v >> 11) as u8, ((v >> 5) & 0x3f) as u8, (v & 0x1f) as u8);
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn decode(color_type: ColorType, alpha_type: AlphaType, px: &[u8]) -> [u8; 4] {
    match color_type {
        ColorType::Rgb565 => {
            let [r, g, b] = unpack_rgb565([px[0], px[1]]);
            [r, g, b, 255]
        }
        ColorType::Rgba8888 => {
            let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
            match alpha_type {
                AlphaType::Opaque => [r, g, b, 255],
                AlphaType::Premul => [r, g, b, a],
                AlphaType::Unpremul => [
                    premultiply(r, a),
                    premultiply(g, a),
                    premultiply(b, a),
                    a,
                ],
            }
        }
    }
}

fn encode(color_type: ColorType, alpha_type: AlphaType, [r, g, b, a]: [u8; 4], out: &mut [u8]) {
    match color_type {
        ColorType::Rgb565 => out.copy_from_slice(&pack_rgb565(r, g, b)),
        ColorType::Rgba8888 => {
            let px = match alpha_type {
                AlphaType::Opaque => [r, g, b, 255],
                AlphaType::Premul => [r, g, b, a],
                AlphaType::Unpremul => [
                    unpremultiply(r, a),
                    unpremultiply(g, a),
                    unpremultiply(b, a),
                    a,
                ],
            };
            out.copy_from_slice(&px);
        }
    }
}
