// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Imaging Reference Backend.
//!
//! [`RefBackend`] implements [`ImagingBackend`] and [`ResourceBackend`] by
//! recording what it is asked to do. It does not rasterize. Tests use it to
//! assert on the ops a picture replays, the imaging state at the time each op
//! is applied, and whether every resource a playback installed was destroyed
//! again.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

use strata_imaging::{
    Affine, DrawOp, FillRule, ImageDesc, ImageId, ImagingBackend, ImagingOp, LayerOp, PaintDesc,
    PaintId, PathDesc, PathId, Picture, PictureId, ResourceBackend, ResourceTable, StateOp,
    StrokeStyle,
};

/// Snapshot of the current imaging state inside the backend.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Current transform.
    pub transform: Affine,
    /// Current paint-space transform.
    pub paint_transform: Affine,
    /// Number of open layers.
    pub layer_stack_depth: usize,
    /// The most recently pushed layer op, if any.
    pub layer_top: Option<LayerOp>,
    /// Current paint, if set.
    pub paint: Option<PaintId>,
    /// Current stroke style, if set.
    pub stroke: Option<StrokeStyle>,
    /// Current fill rule used for filling and clipping paths.
    pub fill_rule: FillRule,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            paint_transform: Affine::IDENTITY,
            layer_stack_depth: 0,
            layer_top: None,
            paint: None,
            stroke: None,
            fill_rule: FillRule::NonZero,
        }
    }
}

/// Event recorded by the reference backend.
#[derive(Clone, Debug)]
pub enum Event {
    /// State operation and the resulting state snapshot.
    State {
        /// State operation that was applied.
        op: StateOp,
        /// Snapshot after applying the state operation.
        state: StateSnapshot,
    },
    /// Draw operation and the state snapshot used for drawing.
    Draw {
        /// Draw operation that was applied.
        op: DrawOp,
        /// Snapshot at the time of drawing.
        state: StateSnapshot,
    },
}

/// Number of resources of each kind that are currently alive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveResources {
    /// Live paths.
    pub paths: usize,
    /// Live images.
    pub images: usize,
    /// Live paints.
    pub paints: usize,
    /// Live pictures.
    pub pictures: usize,
}

impl LiveResources {
    /// Returns `true` if nothing is alive.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Tracing implementation of [`ImagingBackend`].
///
/// Resources are kept in id-indexed tables, the imaging state is updated as
/// state ops arrive, and every op is logged as an [`Event`] together with the
/// state it was applied under.
///
/// Draw ops that refer to destroyed or never-created resources are still
/// logged but counted in [`RefBackend::dangling_draws`].
#[derive(Default, Debug)]
pub struct RefBackend {
    paths: ResourceTable<PathDesc>,
    images: ResourceTable<(ImageDesc, Vec<u8>)>,
    paints: ResourceTable<PaintDesc>,
    pictures: ResourceTable<Picture>,

    events: Vec<Event>,
    ops: Vec<ImagingOp>,
    dangling_draws: usize,
    state: StateSnapshot,
    layer_stack: Vec<LayerOp>,
}

impl RefBackend {
    /// Every event, in the order it was applied.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The raw op stream, in the order it was applied.
    pub fn ops(&self) -> &[ImagingOp] {
        &self.ops
    }

    /// Only the draw operations, in order.
    pub fn draws(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ImagingOp::Draw(op) => Some(op),
                ImagingOp::State(_) => None,
            })
            .collect()
    }

    /// Current imaging state.
    pub fn state_snapshot(&self) -> &StateSnapshot {
        &self.state
    }

    /// Number of draws that referred to a resource that was not alive.
    pub fn dangling_draws(&self) -> usize {
        self.dangling_draws
    }

    /// Counts of resources that were created and not yet destroyed.
    pub fn live_resources(&self) -> LiveResources {
        LiveResources {
            paths: self.paths.live(),
            images: self.images.live(),
            paints: self.paints.live(),
            pictures: self.pictures.live(),
        }
    }

    /// Returns the path behind `id`, if alive.
    pub fn path(&self, id: PathId) -> Option<&PathDesc> {
        self.paths.get(id.0)
    }

    /// Returns the paint behind `id`, if alive.
    pub fn paint(&self, id: PaintId) -> Option<&PaintDesc> {
        self.paints.get(id.0)
    }

    /// Forget the event log; resources stay alive.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.ops.clear();
        self.dangling_draws = 0;
    }

    fn is_dangling(&self, op: &DrawOp) -> bool {
        match op {
            DrawOp::FillPath(id) | DrawOp::StrokePath(id) => self.paths.get(id.0).is_none(),
            DrawOp::DrawImage { image, .. } | DrawOp::DrawImageRect { image, .. } => {
                self.images.get(image.0).is_none()
            }
            DrawOp::DrawPicture { picture, .. } => self.pictures.get(picture.0).is_none(),
            DrawOp::FillRect { .. } | DrawOp::StrokeRect { .. } => false,
        }
    }

    fn sync_layer_top(&mut self) {
        self.state.layer_stack_depth = self.layer_stack.len();
        self.state.layer_top = self.layer_stack.last().cloned();
    }
}

impl ResourceBackend for RefBackend {
    fn create_path(&mut self, desc: PathDesc) -> PathId {
        PathId(self.paths.insert(desc))
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

impl ImagingBackend for RefBackend {
    fn state(&mut self, op: StateOp) {
        match &op {
            StateOp::SetTransform(tx) => self.state.transform = *tx,
            StateOp::SetPaintTransform(tx) => self.state.paint_transform = *tx,
            StateOp::PushLayer(layer) => {
                self.layer_stack.push(layer.clone());
                self.sync_layer_top();
            }
            StateOp::PopLayer => {
                self.layer_stack.pop();
                self.sync_layer_top();
            }
            StateOp::SetPaint(id) => self.state.paint = Some(*id),
            StateOp::SetStroke(style) => self.state.stroke = Some(style.clone()),
            StateOp::SetFillRule(rule) => self.state.fill_rule = *rule,
        }

        self.ops.push(ImagingOp::State(op.clone()));
        self.events.push(Event::State {
            op,
            state: self.state.clone(),
        });
    }

    fn draw(&mut self, op: DrawOp) {
        if self.is_dangling(&op) {
            self.dangling_draws += 1;
        }
        self.ops.push(ImagingOp::Draw(op.clone()));
        self.events.push(Event::Draw {
            op,
            state: self.state.clone(),
        });
    }
}
