// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform buffer formats and their pixel interpretation.

use core::fmt;

use strata_imaging::pixels::{AlphaType, ColorType};

/// Raw pixel format code reported by a platform buffer or window.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferFormat(pub i32);

impl BufferFormat {
    /// 16-bit RGB with 5/6/5 bits per channel.
    pub const RGB_565: Self = Self(3);
    /// 32-bit RGBA with 8 bits per channel.
    pub const RGBA_8888: Self = Self(12);
}

impl fmt::Debug for BufferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RGB_565 => f.write_str("RGB_565"),
            Self::RGBA_8888 => f.write_str("RGBA_8888"),
            Self(code) => write!(f, "BufferFormat({code})"),
        }
    }
}

/// Colour and alpha type used to read and write pixels of the given format.
///
/// Returns `None` for formats the software path cannot convert into; callers
/// skip the pixel copy for such buffers.
pub fn resolve_color_type(format: BufferFormat) -> Option<(ColorType, AlphaType)> {
    match format {
        BufferFormat::RGB_565 => Some((ColorType::Rgb565, AlphaType::Opaque)),
        BufferFormat::RGBA_8888 => Some((ColorType::Rgba8888, AlphaType::Premul)),
        _ => None,
    }
}
