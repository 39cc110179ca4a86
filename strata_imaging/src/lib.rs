// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Imaging: imaging IR, picture recording, and pixel views.
//!
//! Drawing is expressed as a flat stream of plain data ops. Backends consume
//! the stream through two traits, and a recorder captures it into pictures
//! that can be replayed later against any backend.
//!
//! # Core concepts
//!
//! - **Resources**: [`PathId`], [`ImageId`], [`PaintId`] and [`PictureId`]
//!   are `u32` handles. A [`ResourceBackend`] hands them out and takes them back.
//! - **Ops**: [`StateOp`] changes what later draws use; [`DrawOp`] touches
//!   pixels. [`ImagingOp`] is either one.
//! - **Backends**: [`ImagingBackend`] accepts imaging ops. Rasterizers,
//!   tracers, and the recording canvas all implement it.
//! - **Recording**: [`PictureRecorder`] hands out a [`RecordingCanvas`] while a
//!   recording is active and turns it into an immutable [`Picture`] when the
//!   recording ends.
//! - **Pictures**: [`Picture`] is a shared, self-contained, replayable op list
//!   with a per-draw spatial index for culled playback.
//! - **Pixels**: [`pixels`] holds colour/alpha types, [`pixels::ImageInfo`],
//!   and borrowed pixmap views with format-converting copies.
//!
//! # Example
//!
//! ```
//! use peniko::{Brush, Color};
//! use strata_imaging::{DrawOp, ImagingBackend, PaintDesc, PictureRecorder, RectF, ResourceBackend, StateOp};
//!
//! let mut recorder = PictureRecorder::new();
//! assert!(!recorder.is_recording());
//!
//! let canvas = recorder.begin_recording(RectF::new(0.0, 0.0, 100.0, 100.0)).unwrap();
//! let paint = canvas.create_paint(PaintDesc {
//!     brush: Brush::Solid(Color::from_rgb8(200, 40, 40)),
//! });
//! canvas.state(StateOp::SetPaint(paint));
//! canvas.draw(DrawOp::FillRect { x0: 10.0, y0: 10.0, x1: 20.0, y1: 20.0 });
//! assert!(recorder.is_recording());
//!
//! let picture = recorder.end_recording().unwrap();
//! assert!(!recorder.is_recording());
//! assert_eq!(picture.draw_count(), 1);
//! ```

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use peniko::Brush;
pub use peniko::{BlendMode, Fill as FillRule, ImageAlphaType, ImageFormat, ImageSampler};

mod bounds;
mod picture;
pub mod pixels;
mod recorder;
mod table;

pub use picture::Picture;
pub use recorder::{PictureRecorder, RecordingCanvas, RecordingError};
pub use strata_index::{Aabb2D, RTree, RTreeFactory};
pub use table::ResourceTable;

/// Handle to a path created with [`ResourceBackend::create_path`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathId(pub u32);

/// Handle to an image created with [`ResourceBackend::create_image`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// Handle to a paint created with [`ResourceBackend::create_paint`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaintId(pub u32);

/// Identifier for a picture installed in a backend with
/// [`ResourceBackend::create_picture`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PictureId(pub u32);

/// 2D affine transform.
pub type Affine = kurbo::Affine;

/// Stroke parameters installed by [`StateOp::SetStroke`].
pub type StrokeStyle = kurbo::Stroke;

/// Axis-aligned rectangle given by its min and max corners.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RectF {
    /// Minimum X coordinate.
    pub x0: f32,
    /// Minimum Y coordinate.
    pub y0: f32,
    /// Maximum X coordinate.
    pub x1: f32,
    /// Maximum Y coordinate.
    pub y1: f32,
}

impl RectF {
    /// Rectangle spanning `(x0, y0)` to `(x1, y1)`.
    #[inline]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a rectangle from an origin and a size.
    #[inline]
    pub const fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Width of the rectangle (may be negative for inverted rects).
    #[inline]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the rectangle (may be negative for inverted rects).
    #[inline]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Returns `true` if the rectangle has no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_aabb().is_empty()
    }

    /// Widen to a [`kurbo::Rect`].
    #[inline]
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }

    /// Convert from kurbo's rectangle type, rounding outwards to f32.
    #[inline]
    pub fn from_kurbo(rect: kurbo::Rect) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "bounds are conservative; outward rounding below keeps them covering"
        )]
        let narrow = |v: f64| v as f32;
        let mut out = Self::new(
            narrow(rect.x0),
            narrow(rect.y0),
            narrow(rect.x1),
            narrow(rect.y1),
        );
        if f64::from(out.x0) > rect.x0 {
            out.x0 = out.x0.next_down();
        }
        if f64::from(out.y0) > rect.y0 {
            out.y0 = out.y0.next_down();
        }
        if f64::from(out.x1) < rect.x1 {
            out.x1 = out.x1.next_up();
        }
        if f64::from(out.y1) < rect.y1 {
            out.y1 = out.y1.next_up();
        }
        out
    }

    /// Convert to the spatial index box type.
    #[inline]
    pub fn to_aabb(self) -> Aabb2D<f32> {
        Aabb2D::new(self.x0, self.y0, self.x1, self.y1)
    }
}

/// An axis-aligned rounded rectangle with a uniform corner radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoundedRectF {
    /// Outer edges.
    pub rect: RectF,
    /// Corner radius.
    pub radius: f32,
}

impl RoundedRectF {
    /// Widen to a [`kurbo::RoundedRect`].
    #[inline]
    pub fn to_kurbo(self) -> kurbo::RoundedRect {
        kurbo::RoundedRect::from_rect(self.rect.to_kurbo(), f64::from(self.radius))
    }
}

/// Geometry a [`ClipOp`] clips to.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipShape {
    /// Rectangle in local coordinates.
    Rect(RectF),
    /// Rounded rectangle in local coordinates.
    RoundedRect(RoundedRectF),
    /// A path resource.
    Path(PathId),
}

impl ClipShape {
    /// Rectangle clip shape.
    #[inline]
    pub fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::Rect(RectF::new(x0, y0, x1, y1))
    }

    /// Rounded rectangle clip shape with one radius for every corner.
    #[inline]
    pub fn rounded_rect(x0: f32, y0: f32, x1: f32, y1: f32, radius: f32) -> Self {
        Self::RoundedRect(RoundedRectF {
            rect: RectF::new(x0, y0, x1, y1),
            radius,
        })
    }
}

/// Outline of `shape` as a [`kurbo::BezPath`].
///
/// Path shapes are looked up through `path_for_id`; `None` means the path is unknown.
pub fn clip_shape_to_bez_path(
    shape: &ClipShape,
    tolerance: f64,
    mut path_for_id: impl FnMut(PathId) -> Option<kurbo::BezPath>,
) -> Option<kurbo::BezPath> {
    use kurbo::Shape;

    match shape {
        ClipShape::Rect(rect) => Some(rect.to_kurbo().to_path(tolerance)),
        ClipShape::RoundedRect(rr) => Some(rr.to_kurbo().to_path(tolerance)),
        ClipShape::Path(id) => path_for_id(*id),
    }
}

/// Compute the filled outline of a stroked [`ClipShape`].
pub fn stroke_outline_for_clip_shape(
    shape: &ClipShape,
    style: &StrokeStyle,
    tolerance: f64,
    mut path_for_id: impl FnMut(PathId) -> Option<kurbo::BezPath>,
) -> Option<kurbo::BezPath> {
    use kurbo::{Shape, StrokeOpts, stroke};

    let outline = match shape {
        ClipShape::Rect(rect) => stroke(
            rect.to_kurbo().path_elements(tolerance),
            style,
            &StrokeOpts::default(),
            tolerance,
        ),
        ClipShape::RoundedRect(rr) => stroke(
            rr.to_kurbo().path_elements(tolerance),
            style,
            &StrokeOpts::default(),
            tolerance,
        ),
        ClipShape::Path(id) => {
            let path = path_for_id(*id)?;
            stroke(path.iter(), style, &StrokeOpts::default(), tolerance)
        }
    };
    Some(outline)
}

/// How a layer restricts its contents.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipOp {
    /// Clip to the fill region of a shape.
    Fill {
        /// Region to keep.
        shape: ClipShape,
        /// Winding rule for path shapes.
        fill_rule: FillRule,
    },
    /// Keep only what falls under the stroke of a shape.
    Stroke {
        /// Shape to stroke.
        shape: ClipShape,
        /// Stroke that produces the outline.
        style: StrokeStyle,
    },
}

impl ClipOp {
    /// The shape this clip is derived from.
    #[inline]
    pub fn shape(&self) -> &ClipShape {
        match self {
            Self::Fill { shape, .. } | Self::Stroke { shape, .. } => shape,
        }
    }
}

/// A compositing layer opened by [`StateOp::PushLayer`].
///
/// Every field is optional; a layer with none set changes nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerOp {
    /// Clip for the layer contents.
    pub clip: Option<ClipOp>,
    /// Blend mode used when the layer is merged down.
    pub blend: Option<BlendMode>,
    /// Group opacity in `0.0..=1.0`.
    pub opacity: Option<f32>,
}

impl LayerOp {
    /// A layer that only clips.
    #[inline]
    pub fn clip(clip: ClipOp) -> Self {
        Self {
            clip: Some(clip),
            blend: None,
            opacity: None,
        }
    }

    /// Returns `true` if no field is set.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.clip.is_none() && self.blend.is_none() && self.opacity.is_none()
    }
}

/// Ops that change the state later draws are made with.
#[derive(Clone, Debug, PartialEq)]
pub enum StateOp {
    /// Replace the current transform. Not concatenated with the previous one.
    SetTransform(Affine),
    /// Replace the transform brushes are sampled through.
    SetPaintTransform(Affine),
    /// Open a layer. Each one is closed by a matching [`StateOp::PopLayer`].
    PushLayer(LayerOp),
    /// Close the innermost layer.
    PopLayer,
    /// Use this paint for subsequent fills and strokes.
    SetPaint(PaintId),
    /// Use this stroke for subsequent stroke ops.
    SetStroke(StrokeStyle),
    /// Winding rule for path fills.
    SetFillRule(FillRule),
}

/// Ops that put pixels down using the current state.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Fill a path.
    FillPath(PathId),
    /// Stroke a path.
    StrokePath(PathId),
    /// Fill a rectangle.
    FillRect {
        /// Minimum X coordinate.
        x0: f32,
        /// Minimum Y coordinate.
        y0: f32,
        /// Maximum X coordinate.
        x1: f32,
        /// Maximum Y coordinate.
        y1: f32,
    },
    /// Stroke a rectangle.
    StrokeRect {
        /// Minimum X coordinate.
        x0: f32,
        /// Minimum Y coordinate.
        y0: f32,
        /// Maximum X coordinate.
        x1: f32,
        /// Maximum Y coordinate.
        y1: f32,
    },
    /// Draw an image at its natural size with an explicit transform.
    DrawImage {
        /// Image to draw.
        image: ImageId,
        /// Transform applied to the image on top of the current transform.
        transform: Affine,
        /// Filtering and extend modes.
        sampler: ImageSampler,
    },
    /// Draw part or all of an image into a destination rectangle.
    ///
    /// `dst` is in local coordinates; `src` is in image pixel coordinates and
    /// defaults to the full image.
    DrawImageRect {
        /// Image to draw.
        image: ImageId,
        /// Part of the image to use, in pixels.
        src: Option<RectF>,
        /// Where it lands, in local coordinates.
        dst: RectF,
        /// Filtering and extend modes.
        sampler: ImageSampler,
    },
    /// Replay an installed picture under an extra transform.
    DrawPicture {
        /// Installed picture.
        picture: PictureId,
        /// Transform applied to the picture on top of the current transform.
        transform: Affine,
    },
}

impl DrawOp {
    /// [`DrawOp::FillRect`] covering `rect`.
    #[inline]
    pub fn fill_rect(rect: RectF) -> Self {
        Self::FillRect {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
        }
    }
}

/// One entry of a recorded op stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ImagingOp {
    /// A state op.
    State(StateOp),
    /// A draw op.
    Draw(DrawOp),
}

/// Geometry of a path resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PathDesc {
    /// Path commands in order.
    pub commands: Box<[PathCmd]>,
}

impl PathDesc {
    /// Build the equivalent [`kurbo::BezPath`].
    pub fn to_bez_path(&self) -> kurbo::BezPath {
        let mut p = kurbo::BezPath::new();
        for cmd in self.commands.iter() {
            match *cmd {
                PathCmd::MoveTo { x, y } => p.move_to((f64::from(x), f64::from(y))),
                PathCmd::LineTo { x, y } => p.line_to((f64::from(x), f64::from(y))),
                PathCmd::QuadTo { x1, y1, x, y } => p.quad_to(
                    (f64::from(x1), f64::from(y1)),
                    (f64::from(x), f64::from(y)),
                ),
                PathCmd::CurveTo {
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                } => p.curve_to(
                    (f64::from(x1), f64::from(y1)),
                    (f64::from(x2), f64::from(y2)),
                    (f64::from(x), f64::from(y)),
                ),
                PathCmd::Close => p.close_path(),
            }
        }
        p
    }
}

/// One segment of a [`PathDesc`].
#[expect(missing_docs, reason = "coordinates are described on each variant")]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathCmd {
    /// Start a new subpath at `(x, y)`.
    MoveTo { x: f32, y: f32 },
    /// Straight line to `(x, y)`.
    LineTo { x: f32, y: f32 },
    /// Quadratic curve to `(x, y)` with control point `(x1, y1)`.
    QuadTo { x1: f32, y1: f32, x: f32, y: f32 },
    /// Cubic curve to `(x, y)` with control points `(x1, y1)` and `(x2, y2)`.
    CurveTo {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x: f32,
        y: f32,
    },
    /// Line back to the subpath start.
    Close,
}

/// Layout of the pixels passed to [`ResourceBackend::create_image`].
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel layout.
    pub format: ImageFormat,
    /// Whether colour channels are premultiplied.
    pub alpha_type: ImageAlphaType,
}

/// A paint resource.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintDesc {
    /// Colour source.
    pub brush: Brush,
}

/// Creation and release of the resources ops refer to.
///
/// A handle names the same resource until it is passed to the matching
/// `destroy_*` method.
pub trait ResourceBackend {
    /// Register a path.
    fn create_path(&mut self, desc: PathDesc) -> PathId;
    /// Release a path.
    fn destroy_path(&mut self, id: PathId);

    /// Create an image resource from tightly packed, row-major pixels.
    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId;
    /// Release an image.
    fn destroy_image(&mut self, id: ImageId);

    /// Register a paint.
    fn create_paint(&mut self, desc: PaintDesc) -> PaintId;
    /// Release a paint.
    fn destroy_paint(&mut self, id: PaintId);

    /// Install a finished picture so it can be drawn with [`DrawOp::DrawPicture`].
    fn create_picture(&mut self, picture: Picture) -> PictureId;
    /// Uninstall a picture. The picture itself lives on while other holders keep it.
    fn destroy_picture(&mut self, id: PictureId);
}

/// Consumer of the op stream.
pub trait ImagingBackend: ResourceBackend {
    /// Apply a state op.
    fn state(&mut self, op: StateOp);

    /// Apply a draw op.
    fn draw(&mut self, op: DrawOp);

    /// Open a layer.
    #[inline]
    fn layer_push(&mut self, op: LayerOp) {
        self.state(StateOp::PushLayer(op));
    }

    /// Close the innermost layer.
    #[inline]
    fn layer_pop(&mut self) {
        self.state(StateOp::PopLayer);
    }

    /// Open a layer clipped to a rectangle. Close it with [`ImagingBackend::layer_pop`].
    #[inline]
    fn clip_to_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.layer_push(LayerOp::clip(ClipOp::Fill {
            shape: ClipShape::rect(x0, y0, x1, y1),
            fill_rule: FillRule::NonZero,
        }));
    }
}

/// Closure helpers for [`ImagingBackend`] implementations and callers.
///
/// This is separate from [`ImagingBackend`] so that `&mut dyn ImagingBackend`
/// stays usable.
pub trait ImagingBackendExt: ImagingBackend {
    /// Run `f` with `op` pushed. The layer stays open if `f` panics.
    #[inline]
    fn with_layer<R>(&mut self, op: LayerOp, f: impl FnOnce(&mut Self) -> R) -> R {
        self.layer_push(op);
        let out = f(self);
        self.layer_pop();
        out
    }

    /// Run `f` clipped to `rect`.
    #[inline]
    fn with_clip_rect<R>(&mut self, rect: RectF, f: impl FnOnce(&mut Self) -> R) -> R {
        self.with_layer(
            LayerOp::clip(ClipOp::Fill {
                shape: ClipShape::Rect(rect),
                fill_rule: FillRule::NonZero,
            }),
            f,
        )
    }

    /// Run `f` inside a layer with group opacity.
    #[inline]
    fn with_opacity_layer<R>(&mut self, opacity: f32, f: impl FnOnce(&mut Self) -> R) -> R {
        self.with_layer(
            LayerOp {
                clip: None,
                blend: None,
                opacity: Some(opacity),
            },
            f,
        )
    }
}

impl<B: ImagingBackend + ?Sized> ImagingBackendExt for B {}
