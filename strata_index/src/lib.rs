// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Index: axis-aligned bounding-box indexing for recorded drawing.
//!
//! The index maps caller-chosen *slots* (typically the position of a draw
//! operation in a recording) to axis-aligned boxes, and answers "which slots
//! touch this point / rectangle" queries.
//!
//! Two backends are provided:
//!
//! - [`FlatVec`]: a linear scan over all entries. Small, trivially correct, and
//!   used as the oracle in tests.
//! - [`RTree`]: a packed bounding-region tree built with sort-tile-recursive
//!   bulk loading. Edits mark the tree stale; [`Backend::commit`] rebuilds it.
//!   A stale tree still answers queries correctly by scanning.
//!
//! [`RTreeFactory`] captures the tree configuration so a recorder can build one
//! tree per finished recording.
//!
//! ```
//! use strata_index::{Aabb2D, Backend, RTreeFactory};
//!
//! let tree = RTreeFactory::default().build([
//!     (0, Aabb2D::from_xywh(0.0_f32, 0.0, 10.0, 10.0)),
//!     (1, Aabb2D::from_xywh(50.0, 50.0, 10.0, 10.0)),
//! ]);
//! let hits: Vec<usize> = tree.query_rect(Aabb2D::new(0.0, 0.0, 20.0, 20.0)).collect();
//! assert_eq!(hits, vec![0]);
//! ```

#![no_std]

extern crate alloc;

mod backend;
mod backends;
mod types;

pub use backend::Backend;
pub use backends::FlatVec;
#[cfg(feature = "backend_rtree")]
pub use backends::{RTree, RTreeFactory};
pub use types::{Aabb2D, Scalar};
