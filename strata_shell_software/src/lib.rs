// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Shell Software: presenting CPU-rendered frames to a platform window.
//!
//! The software presentation path renders each frame into a CPU
//! [backing store](strata_imaging_vello_cpu::RasterSurface), then copies it into
//! a pixel buffer checked out from the window's buffer queue and flushes that
//! buffer back to the compositor.
//!
//! - [`platform`] is the seam to the windowing system: [`PlatformWindow`],
//!   [`BufferQueue`] and [`SurfaceBuffer`] plus the request and flush
//!   configuration values they exchange.
//! - [`format`] maps platform buffer formats to pixel colour and alpha types.
//! - [`SoftwareSurface`] drives binding, backing store reuse and presentation.
//! - [`SoftwareSurfaceConfig`] holds the negotiation constants.
//! - [`defaults`] holds process-wide text defaults for the platform.
//!
//! Presentation is single-threaded per surface. Failures are reported through
//! [`SurfaceError`] and [`PresentError`]; a failed present drops the frame and
//! leaves retrying to the caller.

pub mod defaults;
pub mod format;
pub mod platform;

mod config;
mod error;
mod surface;

pub use config::SoftwareSurfaceConfig;
pub use error::{PresentError, SurfaceError};
pub use format::{BufferFormat, resolve_color_type};
pub use platform::{BufferQueue, PlatformWindow, SurfaceBuffer};
pub use surface::{FrameSize, SoftwareSurface, SurfaceState, align_up};
