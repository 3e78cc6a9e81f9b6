//! Texture Devices
//!
//! The pool never talks to a graphics API directly. Everything it needs from
//! the GPU goes through the [`TextureDevice`] trait:
//!
//! - texture creation (the opaque "create texture" primitive)
//! - memory size queries for budget accounting
//! - debug labels
//! - transient memory discard / re-acquire
//! - writable state transitions for reused targets
//!
//! # Available Devices
//!
//! - [`WgpuTextureDevice`]: real GPU textures through `wgpu`
//! - [`HeadlessDevice`]: in-memory textures that record every device call,
//!   for tests, benchmarks and tools that run without a GPU

pub mod headless;
pub mod wgpu_device;

pub use headless::{DeviceEvent, HeadlessDevice, HeadlessTexture};
pub use wgpu_device::{WgpuTexture, WgpuTextureDevice};

use crate::desc::{ClearValue, RenderTargetDesc, RenderTargetDimension, TargetableFlags, TextureFlags};
use crate::errors::Result;

/// Features of the device that change pool behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Storage (UAV) textures can be created. Requesting a UAV target on a
    /// device without this is a programming error.
    pub supports_uav: bool,
    /// The device has a fast memory pool that honors [`TextureFlags::FAST_VRAM`].
    pub supports_fast_vram: bool,
    /// Physical pages of transient textures can be discarded and re-acquired.
    pub supports_transient_aliasing: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            supports_uav: true,
            supports_fast_vram: false,
            supports_transient_aliasing: false,
        }
    }
}

/// Shape of a texture to create. Each variant maps to a distinct creation
/// path on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureShape {
    D2 { width: u32, height: u32 },
    D2Array { width: u32, height: u32, layers: u32 },
    D3 { width: u32, height: u32, depth: u32 },
    Cube { size: u32 },
    CubeArray { size: u32, cubes: u32 },
}

impl TextureShape {
    #[must_use]
    pub fn from_desc(desc: &RenderTargetDesc) -> Self {
        match desc.dimension {
            RenderTargetDimension::Texture2D => Self::D2 {
                width: desc.width,
                height: desc.height,
            },
            RenderTargetDimension::Texture2DArray => Self::D2Array {
                width: desc.width,
                height: desc.height,
                layers: desc.array_size,
            },
            RenderTargetDimension::Texture3D => Self::D3 {
                width: desc.width,
                height: desc.height,
                depth: desc.depth,
            },
            RenderTargetDimension::TextureCube => Self::Cube { size: desc.width },
            RenderTargetDimension::TextureCubeArray => Self::CubeArray {
                size: desc.width,
                cubes: desc.array_size,
            },
        }
    }

    /// Width, height and volume depth of mip 0 (depth is 1 for non-3D shapes).
    #[must_use]
    pub fn mip0_extent(&self) -> (u32, u32, u32) {
        match *self {
            Self::D2 { width, height } | Self::D2Array { width, height, .. } => (width, height, 1),
            Self::D3 {
                width,
                height,
                depth,
            } => (width, height, depth),
            Self::Cube { size } | Self::CubeArray { size, .. } => (size, size, 1),
        }
    }

    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match *self {
            Self::D2 { .. } | Self::D3 { .. } => 1,
            Self::D2Array { layers, .. } => layers,
            Self::Cube { .. } => 6,
            Self::CubeArray { cubes, .. } => 6 * cubes,
        }
    }
}

/// Everything a device needs to create one texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureCreateInfo<'a> {
    pub label: &'a str,
    pub shape: TextureShape,
    pub format: wgpu::TextureFormat,
    pub mip_count: u32,
    pub sample_count: u32,
    pub usage: TargetableFlags,
    pub clear_value: ClearValue,
    /// Only set when the device supports fast VRAM.
    pub fast_vram: bool,
    /// Only set when the device supports transient aliasing.
    pub transient: bool,
}

impl<'a> TextureCreateInfo<'a> {
    /// Builds the creation info of the primary texture of `desc`. Hints the
    /// device cannot honor are dropped here, so devices never see them.
    #[must_use]
    pub fn for_desc(desc: &RenderTargetDesc, label: &'a str, caps: DeviceCapabilities) -> Self {
        Self {
            label,
            shape: TextureShape::from_desc(desc),
            format: desc.format,
            mip_count: desc.mip_count,
            sample_count: desc.sample_count,
            usage: desc.targetable,
            clear_value: desc.clear_value,
            fast_vram: caps.supports_fast_vram && desc.flags.contains(TextureFlags::FAST_VRAM),
            transient: caps.supports_transient_aliasing && desc.is_transient(),
        }
    }

    /// Estimated allocation size in bytes, summed over mips, layers and samples.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        let (block_width, block_height) = self.format.block_dimensions();
        let block_bytes = u64::from(bytes_per_block(self.format));
        let (width, height, depth) = self.shape.mip0_extent();

        let mut per_layer = 0u64;
        for mip in 0..self.mip_count {
            let mip_width = width.checked_shr(mip).unwrap_or(0).max(1);
            let mip_height = height.checked_shr(mip).unwrap_or(0).max(1);
            let mip_depth = depth.checked_shr(mip).unwrap_or(0).max(1);
            let blocks = u64::from(mip_width.div_ceil(block_width))
                * u64::from(mip_height.div_ceil(block_height))
                * u64::from(mip_depth);
            per_layer += blocks * block_bytes;
        }

        per_layer * u64::from(self.shape.layer_count()) * u64::from(self.sample_count)
    }
}

fn bytes_per_block(format: wgpu::TextureFormat) -> u32 {
    // Packed depth-stencil formats have no single copy size.
    format.block_copy_size(None).unwrap_or(match format {
        wgpu::TextureFormat::Depth32FloatStencil8 => 8,
        _ => 4,
    })
}

/// The GPU-facing side of the pool.
///
/// All methods take `&self` and are called from the pool's owning thread.
/// Device failures during creation are returned as errors and propagated
/// unchanged to the caller of the pool; the pool never retries.
pub trait TextureDevice {
    /// The device's texture object. Dropping it releases the GPU memory.
    type Texture;

    fn capabilities(&self) -> DeviceCapabilities;

    fn create_texture(&self, info: &TextureCreateInfo<'_>) -> Result<Self::Texture>;

    /// Backing allocation size of `texture` in bytes.
    fn texture_memory_size(&self, texture: &Self::Texture) -> u64;

    fn set_debug_name(&self, texture: &Self::Texture, name: &str);

    /// Releases the physical pages of a transient texture. Its contents are undefined afterwards.
    fn discard_transient(&self, texture: &Self::Texture);

    /// Maps physical pages back into a transient texture before use.
    fn acquire_transient(&self, texture: &Self::Texture);

    /// Queues a transition of `texture` to a writable state. Fire-and-forget.
    fn transition_writable(&self, texture: &Self::Texture);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(shape: TextureShape, format: wgpu::TextureFormat, mips: u32) -> TextureCreateInfo<'static> {
        TextureCreateInfo {
            label: "test",
            shape,
            format,
            mip_count: mips,
            sample_count: 1,
            usage: TargetableFlags::RENDER_TARGETABLE,
            clear_value: ClearValue::None,
            fast_vram: false,
            transient: false,
        }
    }

    #[test]
    fn estimated_size_of_plain_2d() {
        let info = info(
            TextureShape::D2 { width: 512, height: 512 },
            wgpu::TextureFormat::Rgba8Unorm,
            1,
        );
        assert_eq!(info.estimated_size(), 512 * 512 * 4);
    }

    #[test]
    fn estimated_size_counts_mips_and_faces() {
        let info = info(TextureShape::Cube { size: 4 }, wgpu::TextureFormat::Rgba16Float, 3);
        // 4x4 + 2x2 + 1x1 texels, 8 bytes each, 6 faces
        assert_eq!(info.estimated_size(), (16 + 4 + 1) * 8 * 6);
    }

    #[test]
    fn fast_vram_hint_is_dropped_without_support() {
        let desc = RenderTargetDesc::new_2d(
            8,
            8,
            wgpu::TextureFormat::Rgba8Unorm,
            TargetableFlags::RENDER_TARGETABLE,
        )
        .with_flags(TextureFlags::FAST_VRAM);

        let caps = DeviceCapabilities::default();
        assert!(!TextureCreateInfo::for_desc(&desc, "x", caps).fast_vram);

        let caps = DeviceCapabilities {
            supports_fast_vram: true,
            ..caps
        };
        assert!(TextureCreateInfo::for_desc(&desc, "x", caps).fast_vram);
    }
}
