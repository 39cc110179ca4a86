// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frames rendered through the public [`RasterSurface`] API.

use peniko::{Brush, Color};
use strata_imaging::pixels::{AlphaType, ColorType, ImageInfo};
use strata_imaging::{DrawOp, ImagingBackend, LayerOp, PaintDesc, RectF, ResourceBackend, StateOp};
use strata_imaging_vello_cpu::RasterSurface;

fn surface(w: u32, h: u32) -> RasterSurface {
    let info = ImageInfo::new(w, h, ColorType::Rgba8888, AlphaType::Premul);
    RasterSurface::new(info).unwrap()
}

fn fill_white(backend: &mut impl ImagingBackend, rect: RectF) {
    let paint = backend.create_paint(PaintDesc {
        brush: Brush::Solid(Color::WHITE),
    });
    backend.state(StateOp::SetPaint(paint));
    backend.draw(DrawOp::fill_rect(rect));
}

fn alpha(surface: &RasterSurface, x: u32, y: u32) -> u8 {
    let pixels = surface.peek_pixels().unwrap();
    pixels.premul_rgba(x, y).unwrap()[3]
}

#[test]
fn layers_left_open_are_closed_before_rasterizing() {
    let mut surface = surface(4, 4);
    let depth = surface.render(|b| {
        b.clip_to_rect(0.0, 0.0, 2.0, 2.0);
        b.layer_push(LayerOp {
            clip: None,
            blend: None,
            opacity: Some(1.0),
        });
        fill_white(b, RectF::new(0.0, 0.0, 4.0, 4.0));
        b.layer_depth()
    });
    assert_eq!(depth, 2);
    assert_eq!(alpha(&surface, 1, 1), 255);
    assert_eq!(alpha(&surface, 3, 3), 0);
}

#[test]
fn open_layers_do_not_leak_into_the_next_frame() {
    let mut surface = surface(4, 4);
    surface.render(|b| b.clip_to_rect(0.0, 0.0, 1.0, 1.0));
    let depth = surface.render(|b| {
        fill_white(b, RectF::new(0.0, 0.0, 4.0, 4.0));
        b.layer_depth()
    });
    assert_eq!(depth, 0);
    assert_eq!(alpha(&surface, 3, 3), 255);
}
