#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! GPU render target pool.
//!
//! Allocates, matches, reuses and evicts render targets for a frame-driven
//! renderer. See [`RenderTargetPool`] for the frame model and
//! [`TextureDevice`] for the device seam.

pub mod desc;
pub mod device;
pub mod errors;
pub mod pool;
pub mod settings;
pub mod transience;

pub use desc::{ClearValue, DescMatch, RenderTargetDesc, RenderTargetDimension, TargetableFlags, TextureFlags};
pub use device::{DeviceCapabilities, HeadlessDevice, TextureDevice, WgpuTextureDevice};
pub use errors::{PoolError, Result};
pub use pool::{
    EVICTION_GRACE_FRAMES, FindOptions, MemoryReport, PoolStats, PooledElementView, PooledRenderTarget,
    RenderTargetItem, RenderTargetPool, RenderTargetSnapshot, STALE_FRAME_COUNT, SnapshotArena,
};
pub use settings::{RenderTargetPoolSettings, TransientAliasingMode};
pub use transience::{RenderTargetTransience, needs_transient_override};
