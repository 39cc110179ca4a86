// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vello CPU–backed rasterization of the Strata imaging IR.
//!
//! [`VelloCpuImagingBackend`] implements [`ImagingBackend`] on top of the
//! sparse-strips [`vello_cpu::RenderContext`]. [`RasterSurface`] wraps a render
//! context together with an owned pixel store, and is what a presenter uses as
//! its CPU backing store.
//!
//! ```
//! use peniko::{Brush, Color};
//! use strata_imaging::pixels::{AlphaType, ColorType, ImageInfo};
//! use strata_imaging::{DrawOp, ImagingBackend, PaintDesc, RectF, ResourceBackend, StateOp};
//! use strata_imaging_vello_cpu::RasterSurface;
//!
//! let info = ImageInfo::new(4, 4, ColorType::Rgba8888, AlphaType::Premul);
//! let mut surface = RasterSurface::new(info).unwrap();
//! surface.render(|backend| {
//!     let paint = backend.create_paint(PaintDesc {
//!         brush: Brush::Solid(Color::WHITE),
//!     });
//!     backend.state(StateOp::SetPaint(paint));
//!     backend.draw(DrawOp::fill_rect(RectF::new(0.0, 0.0, 4.0, 4.0)));
//! });
//! let pixels = surface.peek_pixels().unwrap();
//! assert_eq!(&pixels.data()[..4], &[255, 255, 255, 255]);
//! ```

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use kurbo::{Affine, Cap, Join, Shape};
use peniko::{Brush, Fill, ImageData};
use strata_imaging::{
    ClipOp, DrawOp, FillRule, ImageDesc, ImageId, ImagingBackend, LayerOp, PaintDesc, PaintId,
    PathDesc, PathId, Picture, PictureId, RectF, ResourceBackend, ResourceTable, StateOp,
    StrokeStyle, clip_shape_to_bez_path, stroke_outline_for_clip_shape,
};
use vello_cpu::kurbo::{Affine as CpuAffine, BezPath, Cap as CpuCap, Join as CpuJoin, Rect, Stroke};
use vello_cpu::{Image as CpuImage, ImageSource, RenderContext};

mod surface;

pub use surface::{RasterError, RasterSurface, SurfaceId};

const CLIP_TOLERANCE: f64 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum StackEntry {
    Noop,
    Pushed,
}

fn with_temp_fill_rule<C>(
    ctx: &mut C,
    saved: FillRule,
    desired: FillRule,
    mut set_rule: impl FnMut(&mut C, FillRule),
    f: impl FnOnce(&mut C),
) {
    if desired != saved {
        set_rule(ctx, desired);
    }
    f(ctx);
    if desired != saved {
        set_rule(ctx, saved);
    }
}

fn fill_to_cpu(rule: FillRule) -> Fill {
    match rule {
        FillRule::NonZero => Fill::NonZero,
        FillRule::EvenOdd => Fill::EvenOdd,
    }
}

fn stroke_to_cpu(style: &StrokeStyle) -> Stroke {
    let mut stroke = Stroke::new(style.width);
    stroke.miter_limit = style.miter_limit;
    stroke.join = match style.join {
        Join::Bevel => CpuJoin::Bevel,
        Join::Miter => CpuJoin::Miter,
        Join::Round => CpuJoin::Round,
    };
    stroke.start_cap = match style.start_cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    };
    stroke.end_cap = match style.end_cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    };
    stroke
}

fn image_paint(desc: &ImageDesc, pixels: &[u8], sampler: peniko::ImageSampler) -> CpuImage {
    let image_data = ImageData {
        data: peniko::Blob::from(pixels.to_vec()),
        format: desc.format,
        alpha_type: desc.alpha_type,
        width: desc.width,
        height: desc.height,
    };
    CpuImage {
        image: ImageSource::from_peniko_image_data(&image_data),
        sampler,
    }
}

/// State restored after a nested picture has been played into the backend.
struct Saved {
    transform: Affine,
    paint_transform: Affine,
    paint: Option<PaintId>,
    fill_rule: FillRule,
    stroke: StrokeStyle,
    stack_len: usize,
}

/// Rasterizes the imaging IR into a borrowed `vello_cpu` render context.
///
/// Nested pictures drawn with [`DrawOp::DrawPicture`] are played back inline
/// with the current transform applied.
pub struct VelloCpuImagingBackend<'ctx> {
    /// Render context receiving the geometry.
    pub ctx: &'ctx mut RenderContext,
    paths: ResourceTable<BezPath>,
    images: ResourceTable<(ImageDesc, Vec<u8>)>,
    paints: ResourceTable<PaintDesc>,
    pictures: ResourceTable<Picture>,

    stack: Vec<StackEntry>,
    current_paint: Option<PaintId>,
    current_fill_rule: FillRule,
    current_transform: Affine,
    current_paint_transform: Affine,
    current_stroke: StrokeStyle,
}

impl fmt::Debug for VelloCpuImagingBackend<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VelloCpuImagingBackend { .. }")
    }
}

impl<'ctx> VelloCpuImagingBackend<'ctx> {
    /// Backend drawing into `ctx` with default state and no resources.
    pub fn new(ctx: &'ctx mut RenderContext) -> Self {
        Self {
            ctx,
            paths: ResourceTable::new(),
            images: ResourceTable::new(),
            paints: ResourceTable::new(),
            pictures: ResourceTable::new(),
            stack: Vec::new(),
            current_paint: None,
            current_fill_rule: FillRule::NonZero,
            current_transform: Affine::IDENTITY,
            current_paint_transform: Affine::IDENTITY,
            current_stroke: StrokeStyle::default(),
        }
    }

    /// Number of layers currently pushed through [`StateOp::PushLayer`].
    pub fn layer_depth(&self) -> usize {
        self.stack.len()
    }

    fn path_to_bez(&self, id: PathId) -> Option<BezPath> {
        self.paths.get(id.0).cloned()
    }

    fn affine_to_cpu(xf: Affine) -> CpuAffine {
        CpuAffine::new(xf.as_coeffs())
    }

    fn apply_current_paint(&mut self) {
        let Some(id) = self.current_paint else {
            return;
        };
        if let Some(PaintDesc { brush }) = self.paints.get(id.0) {
            match brush.clone() {
                Brush::Solid(color) => {
                    self.ctx.set_paint(color);
                }
                Brush::Gradient(gradient) => {
                    self.ctx.set_paint(gradient);
                }
                Brush::Image(image_brush) => {
                    let source = ImageSource::from_peniko_image_data(&image_brush.image);
                    let image = CpuImage {
                        image: source,
                        sampler: image_brush.sampler,
                    };
                    self.ctx.set_paint(image);
                }
            }
        }
    }

    fn pop_entry(&mut self) {
        match self.stack.pop() {
            Some(StackEntry::Noop) => {}
            Some(StackEntry::Pushed) => self.ctx.pop_layer(),
            None => log::warn!("PopLayer with empty layer stack ignored"),
        }
    }

    fn save(&self) -> Saved {
        Saved {
            transform: self.current_transform,
            paint_transform: self.current_paint_transform,
            paint: self.current_paint,
            fill_rule: self.current_fill_rule,
            stroke: self.current_stroke.clone(),
            stack_len: self.stack.len(),
        }
    }

    fn restore(&mut self, saved: Saved) {
        while self.stack.len() > saved.stack_len {
            self.pop_entry();
        }
        self.state(StateOp::SetTransform(saved.transform));
        self.state(StateOp::SetPaintTransform(saved.paint_transform));
        self.state(StateOp::SetFillRule(saved.fill_rule));
        self.state(StateOp::SetStroke(saved.stroke));
        self.current_paint = saved.paint;
        self.apply_current_paint();
    }

    /// Fill the image's natural bounds, placed by `local`, with `image`, then
    /// put back the transform and paint.
    fn fill_with_image(&mut self, image: CpuImage, local: Affine, width: u32, height: u32) {
        let saved_transform = *self.ctx.transform();
        let saved_paint = self.ctx.paint().clone();

        self.ctx.set_paint(image);
        self.ctx
            .set_transform(saved_transform * Self::affine_to_cpu(local));
        self.ctx
            .fill_rect(&Rect::new(0.0, 0.0, f64::from(width), f64::from(height)));

        self.ctx.set_transform(saved_transform);
        self.ctx.set_paint(saved_paint);
    }
}

impl ResourceBackend for VelloCpuImagingBackend<'_> {
    fn create_path(&mut self, desc: PathDesc) -> PathId {
        PathId(self.paths.insert(desc.to_bez_path()))
    }

    fn destroy_path(&mut self, id: PathId) {
        self.paths.remove(id.0);
    }

    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId {
        ImageId(self.images.insert((desc, pixels.to_vec())))
    }

    fn destroy_image(&mut self, id: ImageId) {
        self.images.remove(id.0);
    }

    fn create_paint(&mut self, desc: PaintDesc) -> PaintId {
        PaintId(self.paints.insert(desc))
    }

    fn destroy_paint(&mut self, id: PaintId) {
        self.paints.remove(id.0);
    }

    fn create_picture(&mut self, picture: Picture) -> PictureId {
        PictureId(self.pictures.insert(picture))
    }

    fn destroy_picture(&mut self, id: PictureId) {
        self.pictures.remove(id.0);
    }
}

impl ImagingBackend for VelloCpuImagingBackend<'_> {
    fn state(&mut self, op: StateOp) {
        match op {
            StateOp::SetTransform(xf) => {
                self.current_transform = xf;
                self.ctx.set_transform(Self::affine_to_cpu(xf));
            }
            StateOp::SetPaintTransform(xf) => {
                self.current_paint_transform = xf;
                self.ctx.set_paint_transform(Self::affine_to_cpu(xf));
            }
            StateOp::PushLayer(layer) => {
                let LayerOp {
                    clip,
                    blend,
                    opacity,
                } = layer;

                let mut desired_fill_rule = self.current_fill_rule;
                let clip_path: Option<BezPath> = match clip {
                    Some(ClipOp::Fill { shape, fill_rule }) => {
                        desired_fill_rule = fill_rule;
                        clip_shape_to_bez_path(&shape, CLIP_TOLERANCE, |id| self.path_to_bez(id))
                    }
                    Some(ClipOp::Stroke { shape, style }) => {
                        stroke_outline_for_clip_shape(&shape, &style, CLIP_TOLERANCE, |id| {
                            self.path_to_bez(id)
                        })
                    }
                    None => None,
                };

                if clip_path.is_some() || blend.is_some() || opacity.is_some() {
                    let saved = self.current_fill_rule;
                    with_temp_fill_rule(
                        self.ctx,
                        saved,
                        desired_fill_rule,
                        |ctx, rule| ctx.set_fill_rule(fill_to_cpu(rule)),
                        |ctx| ctx.push_layer(clip_path.as_ref(), blend, opacity, None, None),
                    );
                    self.stack.push(StackEntry::Pushed);
                } else {
                    self.stack.push(StackEntry::Noop);
                }
            }
            StateOp::PopLayer => self.pop_entry(),
            StateOp::SetPaint(id) => {
                self.current_paint = Some(id);
                self.apply_current_paint();
            }
            StateOp::SetStroke(style) => {
                self.ctx.set_stroke(stroke_to_cpu(&style));
                self.current_stroke = style;
            }
            StateOp::SetFillRule(rule) => {
                self.current_fill_rule = rule;
                self.ctx.set_fill_rule(fill_to_cpu(rule));
            }
        }
    }

    fn draw(&mut self, op: DrawOp) {
        match op {
            DrawOp::FillPath(id) => {
                if let Some(path) = self.path_to_bez(id) {
                    self.ctx.fill_path(&path);
                }
            }
            DrawOp::StrokePath(id) => {
                if let Some(path) = self.path_to_bez(id) {
                    self.ctx.stroke_path(&path);
                }
            }
            DrawOp::FillRect { x0, y0, x1, y1 } => {
                self.ctx
                    .fill_rect(&RectF::new(x0, y0, x1, y1).to_kurbo());
            }
            DrawOp::StrokeRect { x0, y0, x1, y1 } => {
                self.ctx
                    .stroke_rect(&RectF::new(x0, y0, x1, y1).to_kurbo());
            }
            DrawOp::DrawImage {
                image,
                transform,
                sampler,
            } => {
                let Some((desc, pixels)) = self.images.get(image.0) else {
                    return;
                };
                let (width, height) = (desc.width, desc.height);
                let paint = image_paint(desc, pixels, sampler);
                self.fill_with_image(paint, transform, width, height);
            }
            DrawOp::DrawImageRect {
                image,
                src,
                dst,
                sampler,
            } => {
                let Some((desc, pixels)) = self.images.get(image.0) else {
                    return;
                };
                let full = RectF::new(0.0, 0.0, desc.width as f32, desc.height as f32);
                let src = src.unwrap_or(full);
                let (dst_w, dst_h) = (dst.width(), dst.height());
                let (src_w, src_h) = (src.width(), src.height());
                if dst_w.abs() < f32::EPSILON
                    || dst_h.abs() < f32::EPSILON
                    || src_w.abs() < f32::EPSILON
                    || src_h.abs() < f32::EPSILON
                {
                    return;
                }

                let local = Affine::translate((f64::from(dst.x0), f64::from(dst.y0)))
                    * Affine::scale_non_uniform(
                        f64::from(dst_w / src_w),
                        f64::from(dst_h / src_h),
                    )
                    * Affine::translate((-f64::from(src.x0), -f64::from(src.y0)));
                let (width, height) = (desc.width, desc.height);
                let paint = image_paint(desc, pixels, sampler);

                // The clip is in the current transform, not the image transform.
                self.ctx
                    .push_clip_layer(&dst.to_kurbo().to_path(CLIP_TOLERANCE));
                self.fill_with_image(paint, local, width, height);
                self.ctx.pop_layer();
            }
            DrawOp::DrawPicture { picture, transform } => {
                let Some(picture) = self.pictures.get(picture.0).cloned() else {
                    return;
                };
                let saved = self.save();
                picture.playback_with_transform(self, saved.transform * transform);
                self.restore(saved);
            }
        }
    }
}
