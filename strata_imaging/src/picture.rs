// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable recorded pictures and their playback.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use strata_index::{Backend, RTree, RTreeFactory};

use crate::{
    Affine, ClipOp, ClipShape, DrawOp, FillRule, ImageDesc, ImageId, ImagingBackend, ImagingOp,
    LayerOp, PaintDesc, PaintId, PathDesc, PathId, RectF, StateOp, StrokeStyle,
};

/// Resources a picture's ops refer to, indexed by the raw handle value.
#[derive(Clone, Debug, Default)]
pub(crate) struct Resources {
    pub(crate) paths: Vec<PathDesc>,
    pub(crate) images: Vec<(ImageDesc, Arc<[u8]>)>,
    pub(crate) paints: Vec<PaintDesc>,
    pub(crate) pictures: Vec<Picture>,
}

impl Resources {
    fn approximate_bytes_used(&self) -> usize {
        let paths: usize = self
            .paths
            .iter()
            .map(|p| size_of::<PathDesc>() + size_of_val(&*p.commands))
            .sum();
        let images: usize = self
            .images
            .iter()
            .map(|(_, px)| size_of::<(ImageDesc, Arc<[u8]>)>() + px.len())
            .sum();
        let paints = self.paints.len() * size_of::<PaintDesc>();
        let pictures: usize = self
            .pictures
            .iter()
            .map(Picture::approximate_bytes_used)
            .sum();
        paths + images + paints + pictures
    }
}

#[derive(Debug)]
struct PictureData {
    cull_rect: RectF,
    ops: Vec<ImagingOp>,
    /// Device-space bounds per op; `None` for state ops.
    bounds: Vec<Option<RectF>>,
    draw_count: usize,
    index: RTree<f32>,
    resources: Resources,
}

/// An immutable, replayable recording of imaging ops.
///
/// Produced by [`PictureRecorder::end_recording`](crate::PictureRecorder::end_recording).
/// Cloning is cheap and shares the recording; a picture is never mutated after
/// it is created, so it can be handed to other threads freely.
///
/// A picture carries copies of every resource its ops use. [`Picture::playback`]
/// installs them into the target backend, replays the ops with the target's
/// handles, and destroys them again.
#[derive(Clone, Debug)]
pub struct Picture {
    data: Arc<PictureData>,
}

impl Picture {
    pub(crate) fn new(
        cull_rect: RectF,
        ops: Vec<ImagingOp>,
        bounds: Vec<Option<RectF>>,
        resources: Resources,
        factory: &RTreeFactory,
    ) -> Self {
        debug_assert_eq!(ops.len(), bounds.len(), "one bounds entry per op");
        let draw_count = bounds.iter().filter(|b| b.is_some()).count();
        let index = factory.build(
            bounds
                .iter()
                .enumerate()
                .filter_map(|(i, b)| b.map(|b| (i, b.to_aabb()))),
        );
        Self {
            data: Arc::new(PictureData {
                cull_rect,
                ops,
                bounds,
                draw_count,
                index,
                resources,
            }),
        }
    }

    /// The bounds the picture was recorded with.
    #[inline]
    pub fn cull_rect(&self) -> RectF {
        self.data.cull_rect
    }

    /// Recorded ops, in recording order. Handles refer to the picture's own resources.
    #[inline]
    pub fn ops(&self) -> &[ImagingOp] {
        &self.data.ops
    }

    /// Total number of recorded ops.
    #[inline]
    pub fn op_count(&self) -> usize {
        self.data.ops.len()
    }

    /// Number of recorded draw ops.
    #[inline]
    pub fn draw_count(&self) -> usize {
        self.data.draw_count
    }

    /// Device-space bounds of the op at `op_index`, or `None` for state ops.
    pub fn draw_bounds(&self, op_index: usize) -> Option<RectF> {
        self.data.bounds.get(op_index).copied().flatten()
    }

    /// Union of all non-empty draw bounds, or `None` if nothing visible was drawn.
    pub fn content_bounds(&self) -> Option<RectF> {
        self.data
            .index
            .bounds()
            .map(|b| RectF::new(b.min_x, b.min_y, b.max_x, b.max_y))
    }

    /// Spatial index over draw ops. Slots are op indices.
    #[inline]
    pub fn index(&self) -> &RTree<f32> {
        &self.data.index
    }

    /// Indices of draw ops whose bounds intersect `rect`, in recording order.
    pub fn query(&self, rect: RectF) -> Vec<usize> {
        let mut hits = Vec::new();
        self.data.index.visit_rect(rect.to_aabb(), |i| hits.push(i));
        hits.sort_unstable();
        hits
    }

    /// Rough estimate of heap and inline memory held by this picture,
    /// including nested pictures and resource payloads.
    pub fn approximate_bytes_used(&self) -> usize {
        size_of::<PictureData>()
            + self.data.ops.len() * (size_of::<ImagingOp>() + size_of::<Option<RectF>>())
            + self.data.draw_count * size_of::<(usize, strata_index::Aabb2D<f32>)>()
            + self.data.resources.approximate_bytes_used()
    }

    /// Replay every op into `target`.
    pub fn playback<B: ImagingBackend + ?Sized>(&self, target: &mut B) {
        self.playback_with_transform(target, Affine::IDENTITY);
    }

    /// Replay every op into `target` with `base` applied on top of every
    /// recorded transform.
    pub fn playback_with_transform<B: ImagingBackend + ?Sized>(
        &self,
        target: &mut B,
        base: Affine,
    ) {
        log::trace!("playing back picture: {} ops", self.op_count());
        self.replay(target, base, None);
    }

    /// Replay into `target`, skipping draw ops whose bounds miss `rect`.
    ///
    /// `rect` is in the picture's coordinate space. Every state op is still
    /// replayed, so layer nesting and the resulting state are unchanged.
    pub fn playback_in_rect<B: ImagingBackend + ?Sized>(&self, target: &mut B, rect: RectF) {
        log::trace!("playing back picture in {rect:?}");
        self.replay(target, Affine::IDENTITY, Some(rect.to_kurbo()));
    }

    fn replay<B: ImagingBackend + ?Sized>(
        &self,
        target: &mut B,
        base: Affine,
        cull: Option<kurbo::Rect>,
    ) {
        let visible = cull.map(|rect| {
            let mut visible = vec![false; self.data.ops.len()];
            for i in self.query(RectF::from_kurbo(rect)) {
                visible[i] = true;
            }
            visible
        });

        let installed = Installed::install(&self.data.resources, target);
        let mut state = ReplayState::new(base);
        target.state(StateOp::SetTransform(base));

        for (i, op) in self.data.ops.iter().enumerate() {
            match op {
                ImagingOp::State(op) => {
                    if let Some(op) = state.map_state(op, &installed) {
                        target.state(op);
                    }
                }
                ImagingOp::Draw(op) => {
                    if visible.as_ref().is_some_and(|v| !v[i]) {
                        continue;
                    }
                    if let DrawOp::DrawPicture { picture, transform } = op {
                        let Some(nested) = self.data.resources.pictures.get(picture.0 as usize)
                        else {
                            continue;
                        };
                        let placement = state.local * *transform;
                        let nested_cull = match cull {
                            None => None,
                            Some(_) if placement.determinant().abs() < 1e-12 => continue,
                            Some(rect) => Some(placement.inverse().transform_rect_bbox(rect)),
                        };
                        nested.replay(target, base * placement, nested_cull);
                        state.restore_after(nested, target);
                    } else if let Some(op) = map_draw(op, &installed) {
                        target.draw(op);
                    }
                }
            }
        }

        installed.uninstall(target);
    }
}

/// Target-side handles for a picture's resources, indexed like [`Resources`].
struct Installed {
    paths: Vec<PathId>,
    images: Vec<ImageId>,
    paints: Vec<PaintId>,
}

impl Installed {
    fn install<B: ImagingBackend + ?Sized>(resources: &Resources, target: &mut B) -> Self {
        Self {
            paths: resources
                .paths
                .iter()
                .map(|p| target.create_path(p.clone()))
                .collect(),
            images: resources
                .images
                .iter()
                .map(|(desc, px)| target.create_image(desc.clone(), px))
                .collect(),
            paints: resources
                .paints
                .iter()
                .map(|p| target.create_paint(p.clone()))
                .collect(),
        }
    }

    fn uninstall<B: ImagingBackend + ?Sized>(self, target: &mut B) {
        for id in self.paths {
            target.destroy_path(id);
        }
        for id in self.images {
            target.destroy_image(id);
        }
        for id in self.paints {
            target.destroy_paint(id);
        }
    }

    fn path(&self, id: PathId) -> Option<PathId> {
        self.paths.get(id.0 as usize).copied()
    }

    fn image(&self, id: ImageId) -> Option<ImageId> {
        self.images.get(id.0 as usize).copied()
    }

    fn paint(&self, id: PaintId) -> Option<PaintId> {
        self.paints.get(id.0 as usize).copied()
    }
}

/// State of one picture's replay that must survive a nested picture.
struct ReplayState {
    base: Affine,
    local: Affine,
    paint: Option<PaintId>,
    paint_transform: Affine,
    stroke: StrokeStyle,
    fill_rule: FillRule,
}

impl ReplayState {
    fn new(base: Affine) -> Self {
        Self {
            base,
            local: Affine::IDENTITY,
            paint: None,
            paint_transform: Affine::IDENTITY,
            stroke: StrokeStyle::default(),
            fill_rule: FillRule::NonZero,
        }
    }

    fn map_state(&mut self, op: &StateOp, installed: &Installed) -> Option<StateOp> {
        Some(match op {
            StateOp::SetTransform(xf) => {
                self.local = *xf;
                StateOp::SetTransform(self.base * *xf)
            }
            StateOp::SetPaintTransform(xf) => {
                self.paint_transform = *xf;
                StateOp::SetPaintTransform(*xf)
            }
            StateOp::PushLayer(layer) => StateOp::PushLayer(map_layer(layer, installed)),
            StateOp::PopLayer => StateOp::PopLayer,
            StateOp::SetPaint(id) => {
                let id = installed.paint(*id)?;
                self.paint = Some(id);
                StateOp::SetPaint(id)
            }
            StateOp::SetStroke(style) => {
                self.stroke = style.clone();
                StateOp::SetStroke(style.clone())
            }
            StateOp::SetFillRule(rule) => {
                self.fill_rule = *rule;
                StateOp::SetFillRule(*rule)
            }
        })
    }

    /// Re-establish this replay's state after `nested` has played into `target`.
    fn restore_after<B: ImagingBackend + ?Sized>(&self, nested: &Picture, target: &mut B) {
        target.state(StateOp::SetTransform(self.base * self.local));
        let sets = |f: fn(&StateOp) -> bool| {
            nested
                .ops()
                .iter()
                .any(|op| matches!(op, ImagingOp::State(s) if f(s)))
        };
        if sets(|s| matches!(s, StateOp::SetPaintTransform(_))) {
            target.state(StateOp::SetPaintTransform(self.paint_transform));
        }
        if sets(|s| matches!(s, StateOp::SetStroke(_))) {
            target.state(StateOp::SetStroke(self.stroke.clone()));
        }
        if sets(|s| matches!(s, StateOp::SetFillRule(_))) {
            target.state(StateOp::SetFillRule(self.fill_rule));
        }
        if let Some(paint) = self.paint
            && sets(|s| matches!(s, StateOp::SetPaint(_)))
        {
            target.state(StateOp::SetPaint(paint));
        }
    }
}

fn map_layer(layer: &LayerOp, installed: &Installed) -> LayerOp {
    let map_shape = |shape: &ClipShape| match shape {
        ClipShape::Path(id) => installed
            .path(*id)
            .map_or(ClipShape::Rect(RectF::default()), ClipShape::Path),
        other => other.clone(),
    };
    LayerOp {
        clip: layer.clip.as_ref().map(|clip| match clip {
            ClipOp::Fill { shape, fill_rule } => ClipOp::Fill {
                shape: map_shape(shape),
                fill_rule: *fill_rule,
            },
            ClipOp::Stroke { shape, style } => ClipOp::Stroke {
                shape: map_shape(shape),
                style: style.clone(),
            },
        }),
        blend: layer.blend,
        opacity: layer.opacity,
    }
}

fn map_draw(op: &DrawOp, installed: &Installed) -> Option<DrawOp> {
    Some(match op {
        DrawOp::FillPath(id) => DrawOp::FillPath(installed.path(*id)?),
        DrawOp::StrokePath(id) => DrawOp::StrokePath(installed.path(*id)?),
        DrawOp::DrawImage {
            image,
            transform,
            sampler,
        } => DrawOp::DrawImage {
            image: installed.image(*image)?,
            transform: *transform,
            sampler: *sampler,
        },
        DrawOp::DrawImageRect {
            image,
            src,
            dst,
            sampler,
        } => DrawOp::DrawImageRect {
            image: installed.image(*image)?,
            src: *src,
            dst: *dst,
            sampler: *sampler,
        },
        DrawOp::FillRect { .. } | DrawOp::StrokeRect { .. } => op.clone(),
        // Nested pictures are expanded inline by `Picture::replay`.
        DrawOp::DrawPicture { .. } => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PictureRecorder, ResourceBackend};
    use peniko::{Brush, Color};

    fn count_draws(n: usize) -> Picture {
        let mut recorder = PictureRecorder::new();
        recorder
            .record(RectF::new(0.0, 0.0, 1000.0, 1000.0), |canvas| {
                let paint = canvas.create_paint(PaintDesc {
                    brush: Brush::Solid(Color::BLACK),
                });
                canvas.state(StateOp::SetPaint(paint));
                for i in 0..n {
                    let x = (i * 20) as f32;
                    canvas.draw(DrawOp::fill_rect(RectF::from_xywh(x, 0.0, 10.0, 10.0)));
                }
            })
            .unwrap()
    }

    #[test]
    fn picture_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Picture>();
    }

    #[test]
    fn counts_and_bounds() {
        let picture = count_draws(3);
        assert_eq!(picture.op_count(), 4);
        assert_eq!(picture.draw_count(), 3);
        assert_eq!(picture.draw_bounds(0), None, "state ops have no bounds");
        assert_eq!(
            picture.draw_bounds(2),
            Some(RectF::new(20.0, 0.0, 30.0, 10.0))
        );
        assert_eq!(picture.draw_bounds(99), None);
        assert_eq!(
            picture.content_bounds(),
            Some(RectF::new(0.0, 0.0, 50.0, 10.0))
        );
        assert_eq!(picture.cull_rect(), RectF::new(0.0, 0.0, 1000.0, 1000.0));
    }

    #[test]
    fn query_returns_recording_order() {
        let picture = count_draws(40);
        let hits = picture.query(RectF::new(15.0, 0.0, 65.0, 5.0));
        assert_eq!(hits, vec![2, 3, 4]);
        assert!(picture.query(RectF::new(0.0, 500.0, 9.0, 510.0)).is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let a = count_draws(2);
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.data, &b.data));
        assert!(a.approximate_bytes_used() >= 3 * size_of::<ImagingOp>());
    }
}
