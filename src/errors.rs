//! Error Types
//!
//! This module defines the error types used by the render target pool.
//!
//! # Overview
//!
//! The main error type [`PoolError`] covers the recoverable failure modes:
//! - GPU texture creation failures reported by the [`TextureDevice`](crate::device::TextureDevice)
//! - Invalid pool configuration (aliasing mode, option names and values)
//! - Settings (de)serialization errors
//!
//! Programming errors, such as requesting UAV access on a device without UAV
//! support, are not represented here: they panic at the call site.
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PoolError>`.
//!
//! ```rust,ignore
//! use myth_rtpool::errors::Result;
//!
//! fn allocate_targets(pool: &mut RenderTargetPool<HeadlessDevice>) -> Result<()> {
//!     let mut scene_color = None;
//!     pool.find_free_element(&desc, &mut scene_color, "SceneColor")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the render target pool.
#[derive(Error, Debug)]
pub enum PoolError {
    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// The device failed to create a texture for a render target.
    #[error("Failed to create texture '{label}': {reason}")]
    TextureCreationFailed {
        /// Debug name of the render target being created
        label: String,
        /// Device-specific description of the failure
        reason: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Transient aliasing mode outside `0..=3`.
    #[error("Invalid transient aliasing mode: {0} (expected 0-3)")]
    InvalidAliasingMode(u8),

    /// Unknown option name passed to `RenderTargetPoolSettings::set_option`.
    #[error("Unknown pool option: {0}")]
    UnknownOption(String),

    /// Option value that could not be parsed.
    #[error("Invalid value '{value}' for pool option {name}")]
    InvalidOptionValue {
        /// Option name
        name: String,
        /// Rejected value
        value: String,
    },

    /// JSON parsing error while loading settings.
    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

/// Alias for `Result<T, PoolError>`.
pub type Result<T> = std::result::Result<T, PoolError>;
