// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording imaging ops into [`Picture`]s.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{ParamCurveExtrema, Rect};
use strata_index::RTreeFactory;

use crate::bounds::BoundsTracker;
use crate::picture::{Picture, Resources};
use crate::{
    ClipOp, ClipShape, DrawOp, ImageDesc, ImageId, ImagingBackend, ImagingOp, PaintDesc, PaintId,
    PathDesc, PathId, PictureId, RectF, ResourceBackend, StateOp,
};

/// Errors reported by [`PictureRecorder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordingError {
    /// `begin_recording` was called while a recording is active.
    AlreadyRecording,
    /// `end_recording` was called with no recording active.
    NotRecording,
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRecording => f.write_str("a recording is already in progress"),
            Self::NotRecording => f.write_str("no recording is in progress"),
        }
    }
}

impl core::error::Error for RecordingError {}

/// Records imaging ops into immutable [`Picture`]s.
///
/// The recorder is either idle or recording. While recording it owns a
/// [`RecordingCanvas`] that callers borrow to issue ops; the canvas cannot
/// outlive the recording. A recorder can be reused for any number of
/// recordings.
#[derive(Debug, Default)]
pub struct PictureRecorder {
    factory: RTreeFactory,
    canvas: Option<RecordingCanvas>,
}

impl PictureRecorder {
    /// Create an idle recorder that indexes pictures with the default R-tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle recorder that indexes pictures with `factory`.
    pub fn with_factory(factory: RTreeFactory) -> Self {
        Self {
            factory,
            canvas: None,
        }
    }

    /// The factory used to build each picture's spatial index.
    pub fn factory(&self) -> &RTreeFactory {
        &self.factory
    }

    /// Returns `true` while a recording is active.
    pub fn is_recording(&self) -> bool {
        self.canvas.is_some()
    }

    /// Start recording ops clipped to `bounds`.
    ///
    /// Fails with [`RecordingError::AlreadyRecording`] if a recording is
    /// active; the active recording is left untouched.
    pub fn begin_recording(
        &mut self,
        bounds: RectF,
    ) -> Result<&mut RecordingCanvas, RecordingError> {
        if self.canvas.is_some() {
            log::warn!("begin_recording called while already recording");
            return Err(RecordingError::AlreadyRecording);
        }
        log::debug!("begin recording in {bounds:?}");
        Ok(self.canvas.insert(RecordingCanvas::new(bounds)))
    }

    /// The active canvas, if recording.
    pub fn canvas(&mut self) -> Option<&mut RecordingCanvas> {
        self.canvas.as_mut()
    }

    /// Finish the active recording and return its picture.
    ///
    /// Fails with [`RecordingError::NotRecording`] when idle, without other
    /// effects. On success the recorder is idle again.
    pub fn end_recording(&mut self) -> Result<Picture, RecordingError> {
        let Some(canvas) = self.canvas.take() else {
            log::debug!("end_recording called while idle");
            return Err(RecordingError::NotRecording);
        };
        let picture = canvas.finish(&self.factory);
        log::debug!(
            "end recording: {} ops, {} draws",
            picture.op_count(),
            picture.draw_count()
        );
        Ok(picture)
    }

    /// Record the ops issued by `f` into a picture.
    pub fn record(
        &mut self,
        bounds: RectF,
        f: impl FnOnce(&mut RecordingCanvas),
    ) -> Result<Picture, RecordingError> {
        f(self.begin_recording(bounds)?);
        self.end_recording()
    }
}

/// Canvas handed out by [`PictureRecorder::begin_recording`].
///
/// Resources created on the canvas are owned by the recording and carried by
/// the resulting picture. Destroying them inside the recording has no effect,
/// since ops already recorded keep referring to them.
///
/// Ops that refer to unknown resources are dropped with a warning, as is a
/// `PopLayer` without a matching `PushLayer`. Layers still open when the
/// recording ends are closed.
#[derive(Debug)]
pub struct RecordingCanvas {
    cull: RectF,
    ops: Vec<ImagingOp>,
    bounds: Vec<Option<RectF>>,
    resources: Resources,
    path_bounds: Vec<Rect>,
    tracker: BoundsTracker,
}

impl RecordingCanvas {
    fn new(cull: RectF) -> Self {
        Self {
            cull,
            ops: Vec::new(),
            bounds: Vec::new(),
            resources: Resources::default(),
            path_bounds: Vec::new(),
            tracker: BoundsTracker::new(cull),
        }
    }

    /// The bounds this recording was started with.
    pub fn cull_rect(&self) -> RectF {
        self.cull
    }

    /// Number of ops recorded so far.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Number of layers currently open.
    pub fn layer_depth(&self) -> usize {
        self.tracker.depth()
    }

    fn push(&mut self, op: ImagingOp, bounds: Option<RectF>) {
        self.ops.push(op);
        self.bounds.push(bounds);
    }

    fn path_bounds(&self, id: PathId) -> Option<Rect> {
        self.path_bounds.get(id.0 as usize).copied()
    }

    fn finish(mut self, factory: &RTreeFactory) -> Picture {
        let open = self.tracker.depth();
        if open > 0 {
            log::warn!("closing {open} unbalanced layer(s) at end of recording");
            for _ in 0..open {
                self.tracker.pop_layer();
                self.push(ImagingOp::State(StateOp::PopLayer), None);
            }
        }
        Picture::new(self.cull, self.ops, self.bounds, self.resources, factory)
    }

    /// Replace path clips that refer to unknown paths with an empty clip, and
    /// return the clip's local bounding box.
    fn resolve_clip(&self, clip: &mut ClipOp) -> Rect {
        let shape = match clip {
            ClipOp::Fill { shape, .. } | ClipOp::Stroke { shape, .. } => shape,
        };
        match shape {
            ClipShape::Rect(r) => r.to_kurbo(),
            ClipShape::RoundedRect(rr) => rr.rect.to_kurbo(),
            ClipShape::Path(id) => {
                let id = *id;
                if let Some(b) = self.path_bounds(id) {
                    b
                } else {
                    log::warn!("clip refers to unknown path {id:?}; clipping everything");
                    *shape = ClipShape::Rect(RectF::default());
                    Rect::ZERO
                }
            }
        }
    }
}

fn path_bbox(desc: &PathDesc) -> Rect {
    desc.to_bez_path()
        .segments()
        .map(|seg| seg.bounding_box())
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO)
}

impl ResourceBackend for RecordingCanvas {
    fn create_path(&mut self, desc: PathDesc) -> PathId {
        let id = u32::try_from(self.resources.paths.len())
            .expect("RecordingCanvas: too many paths for u32 PathId");
        self.path_bounds.push(path_bbox(&desc));
        self.resources.paths.push(desc);
        PathId(id)
    }

    fn destroy_path(&mut self, _id: PathId) {}

    fn create_image(&mut self, desc: ImageDesc, pixels: &[u8]) -> ImageId {
        let id = u32::try_from(self.resources.images.len())
            .expect("RecordingCanvas: too many images for u32 ImageId");
        self.resources.images.push((desc, Arc::from(pixels)));
        ImageId(id)
    }

    fn destroy_image(&mut self, _id: ImageId) {}

    fn create_paint(&mut self, desc: PaintDesc) -> PaintId {
        let id = u32::try_from(self.resources.paints.len())
            .expect("RecordingCanvas: too many paints for u32 PaintId");
        self.resources.paints.push(desc);
        PaintId(id)
    }

    fn destroy_paint(&mut self, _id: PaintId) {}

    fn create_picture(&mut self, picture: Picture) -> PictureId {
        let id = u32::try_from(self.resources.pictures.len())
            .expect("RecordingCanvas: too many pictures for u32 PictureId");
        self.resources.pictures.push(picture);
        PictureId(id)
    }

    fn destroy_picture(&mut self, _id: PictureId) {}
}

impl ImagingBackend for RecordingCanvas {
    fn state(&mut self, op: StateOp) {
        let op = match op {
            StateOp::SetTransform(xf) => {
                self.tracker.set_transform(xf);
                op
            }
            StateOp::SetStroke(ref style) => {
                self.tracker.set_stroke(style.clone());
                op
            }
            StateOp::SetPaint(id) if id.0 as usize >= self.resources.paints.len() => {
                log::warn!("dropping SetPaint with unknown paint {id:?}");
                return;
            }
            StateOp::PushLayer(mut layer) => {
                let local = match layer.clip.as_mut() {
                    Some(clip) => self.resolve_clip(clip),
                    None => Rect::ZERO,
                };
                self.tracker.push_layer(layer.clip.as_ref(), local);
                StateOp::PushLayer(layer)
            }
            StateOp::PopLayer => {
                if !self.tracker.pop_layer() {
                    log::warn!("dropping PopLayer without a matching PushLayer");
                    return;
                }
                op
            }
            StateOp::SetPaint(_) | StateOp::SetPaintTransform(_) | StateOp::SetFillRule(_) => op,
        };
        self.push(ImagingOp::State(op), None);
    }

    fn draw(&mut self, op: DrawOp) {
        let bounds = match &op {
            DrawOp::FillPath(id) | DrawOp::StrokePath(id) => {
                let Some(local) = self.path_bounds(*id) else {
                    log::warn!("dropping draw of unknown path {id:?}");
                    return;
                };
                if matches!(op, DrawOp::FillPath(_)) {
                    self.tracker.fill(local)
                } else {
                    self.tracker.stroke(local)
                }
            }
            DrawOp::FillRect { x0, y0, x1, y1 } => {
                self.tracker.fill(RectF::new(*x0, *y0, *x1, *y1).to_kurbo())
            }
            DrawOp::StrokeRect { x0, y0, x1, y1 } => self
                .tracker
                .stroke(RectF::new(*x0, *y0, *x1, *y1).to_kurbo()),
            DrawOp::DrawImage {
                image, transform, ..
            } => {
                let Some((desc, _)) = self.resources.images.get(image.0 as usize) else {
                    log::warn!("dropping draw of unknown image {image:?}");
                    return;
                };
                let local = Rect::new(0.0, 0.0, f64::from(desc.width), f64::from(desc.height));
                self.tracker.placed(*transform, local)
            }
            DrawOp::DrawImageRect { image, dst, .. } => {
                if self.resources.images.get(image.0 as usize).is_none() {
                    log::warn!("dropping draw of unknown image {image:?}");
                    return;
                }
                self.tracker.fill(dst.to_kurbo())
            }
            DrawOp::DrawPicture { picture, transform } => {
                let Some(nested) = self.resources.pictures.get(picture.0 as usize) else {
                    log::warn!("dropping draw of unknown picture {picture:?}");
                    return;
                };
                self.tracker
                    .placed(*transform, nested.cull_rect().to_kurbo())
            }
        };
        self.push(ImagingOp::Draw(op), Some(bounds));
    }
}
