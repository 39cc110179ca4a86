// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conservative device-space bounds for recorded draw ops.

use alloc::vec::Vec;
use core::f64::consts::SQRT_2;

use kurbo::{Join, Rect};

use crate::{Affine, ClipOp, RectF, StrokeStyle};

/// How far a stroke can reach outside the geometry it outlines.
///
/// Miter joins can extend up to `miter_limit` half-widths; square caps reach
/// `√2` half-widths at the corners.
pub(crate) fn stroke_outset(style: &StrokeStyle) -> f64 {
    let half = style.width.abs() * 0.5;
    let factor = match style.join {
        Join::Miter => style.miter_limit.max(SQRT_2),
        _ => SQRT_2,
    };
    half * factor
}

/// Tracks the transform, stroke and clip stack of a recording so each draw op
/// can be given a device-space bounding box.
#[derive(Clone, Debug)]
pub(crate) struct BoundsTracker {
    cull: Rect,
    ctm: Affine,
    stroke: StrokeStyle,
    /// Device-space clip bounds, one entry per pushed layer. Layers without a
    /// clip repeat their parent's bounds.
    clips: Vec<Rect>,
}

impl BoundsTracker {
    pub(crate) fn new(cull: RectF) -> Self {
        Self {
            cull: cull.to_kurbo(),
            ctm: Affine::IDENTITY,
            stroke: StrokeStyle::default(),
            clips: Vec::new(),
        }
    }

    pub(crate) fn set_transform(&mut self, xf: Affine) {
        self.ctm = xf;
    }

    pub(crate) fn set_stroke(&mut self, style: StrokeStyle) {
        self.stroke = style;
    }

    pub(crate) fn depth(&self) -> usize {
        self.clips.len()
    }

    fn clip_bounds(&self) -> Rect {
        self.clips.last().copied().unwrap_or(self.cull)
    }

    /// Push a layer whose clip, if any, covers `local` in the current space.
    ///
    /// `local` is the clip shape's local bounding box.
    pub(crate) fn push_layer(&mut self, clip: Option<&ClipOp>, local: Rect) {
        let parent = self.clip_bounds();
        let next = match clip {
            None => parent,
            Some(ClipOp::Fill { .. }) => self.ctm.transform_rect_bbox(local).intersect(parent),
            Some(ClipOp::Stroke { style, .. }) => self
                .ctm
                .transform_rect_bbox(local.inflate(stroke_outset(style), stroke_outset(style)))
                .intersect(parent),
        };
        self.clips.push(next);
    }

    /// Pop the innermost layer. Returns `false` if no layer was open.
    pub(crate) fn pop_layer(&mut self) -> bool {
        self.clips.pop().is_some()
    }

    /// Bounds of a filled region with the given local bounding box.
    pub(crate) fn fill(&self, local: Rect) -> RectF {
        self.finish(self.ctm.transform_rect_bbox(local))
    }

    /// Bounds of a stroked region with the given local geometry bounding box.
    pub(crate) fn stroke(&self, local: Rect) -> RectF {
        let outset = stroke_outset(&self.stroke);
        self.finish(self.ctm.transform_rect_bbox(local.inflate(outset, outset)))
    }

    /// Bounds of local content placed with an extra transform on top of the ctm.
    pub(crate) fn placed(&self, transform: Affine, local: Rect) -> RectF {
        self.finish((self.ctm * transform).transform_rect_bbox(local))
    }

    fn finish(&self, device: Rect) -> RectF {
        let clipped = device.intersect(self.clip_bounds()).intersect(self.cull);
        if clipped.is_nan() {
            return RectF::default();
        }
        RectF::from_kurbo(clipped)
    }
}
