// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide text defaults for the platform.
//!
//! Installed once at startup and immutable afterwards.

use std::sync::OnceLock;

pub use crate::error::DefaultsAlreadyInitialized;

/// Which font manager the platform uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontManagerType {
    /// The platform default manager with no special handling.
    #[default]
    None,
}

/// Text defaults shared by every surface in the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDefaults {
    /// Family used when a style names none.
    pub font_family: String,
    /// Font manager selection.
    pub font_manager: FontManagerType,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            font_family: String::from("Arial"),
            font_manager: FontManagerType::None,
        }
    }
}

static DEFAULTS: OnceLock<PlatformDefaults> = OnceLock::new();

/// The installed defaults, installing the built-in ones on first use.
pub fn platform_defaults() -> &'static PlatformDefaults {
    DEFAULTS.get_or_init(PlatformDefaults::default)
}

/// Install `defaults` for the rest of the process.
///
/// Fails if defaults were already installed, including implicitly by
/// [`platform_defaults`].
pub fn init_platform_defaults(
    defaults: PlatformDefaults,
) -> Result<(), DefaultsAlreadyInitialized> {
    DEFAULTS.set(defaults).map_err(|_| {
        log::warn!("platform defaults already initialized");
        DefaultsAlreadyInitialized
    })?;
    log::debug!("platform defaults installed");
    Ok(())
}
