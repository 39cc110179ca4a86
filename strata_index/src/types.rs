// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalar and box types shared by all backends.

use core::cmp::Ordering;
use core::fmt::Debug;
use core::ops::Add;

/// Coordinate type usable in an [`Aabb2D`].
pub trait Scalar: Copy + PartialOrd + Debug + Add<Output = Self> {}

impl Scalar for f32 {}
impl Scalar for f64 {}
impl Scalar for i32 {}
impl Scalar for i64 {}

#[inline]
fn min_of<T: PartialOrd>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

#[inline]
fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

/// Total ordering helper for sorting scalars; incomparable values (NaN) compare equal.
#[inline]
pub(crate) fn cmp_scalar<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Axis-aligned bounding box.
///
/// The box covers `min_x..max_x` horizontally and `min_y..max_y` vertically.
/// A box whose min is not strictly below its max on either axis is empty.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Aabb2D<T> {
    /// Minimum X.
    pub min_x: T,
    /// Minimum Y.
    pub min_y: T,
    /// Maximum X (exclusive for point queries).
    pub max_x: T,
    /// Maximum Y (exclusive for point queries).
    pub max_y: T,
}

impl<T: Scalar> Aabb2D<T> {
    /// Create a box from min/max corners.
    #[inline]
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a box from an origin and a size.
    #[inline]
    pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    /// Returns `true` if the box has no area.
    ///
    /// Boxes containing NaN coordinates are treated as empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min_x < self.max_x && self.min_y < self.max_y)
    }

    /// Intersection of two boxes. The result may be empty.
    #[inline]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(
            max_of(self.min_x, other.min_x),
            max_of(self.min_y, other.min_y),
            min_of(self.max_x, other.max_x),
            min_of(self.max_y, other.max_y),
        )
    }

    /// Returns `true` if the boxes overlap with non-zero area.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Smallest box containing both boxes. Empty inputs are ignored.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(
            min_of(self.min_x, other.min_x),
            min_of(self.min_y, other.min_y),
            max_of(self.max_x, other.max_x),
            max_of(self.max_y, other.max_y),
        )
    }

    /// Returns `true` if the point lies inside the box (max edges excluded).
    #[inline]
    pub fn contains_point(&self, x: T, y: T) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Twice the center X coordinate; a division-free sort key.
    #[inline]
    pub(crate) fn center_key_x(&self) -> T {
        self.min_x + self.max_x
    }

    /// Twice the center Y coordinate; a division-free sort key.
    #[inline]
    pub(crate) fn center_key_y(&self) -> T {
        self.min_y + self.max_y
    }
}
