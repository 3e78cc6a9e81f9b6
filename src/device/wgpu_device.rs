//! wgpu Texture Device
//!
//! Creates pooled render targets as `wgpu` textures, each with a default view
//! matching the target's dimension.
//!
//! wgpu tracks resource states itself and exposes neither fast VRAM nor
//! transient memory, so the device reports both as unsupported and the
//! corresponding trait calls are no-ops.

use crate::desc::TargetableFlags;
use crate::device::{DeviceCapabilities, TextureCreateInfo, TextureDevice, TextureShape};
use crate::errors::{PoolError, Result};

/// A pooled wgpu texture with its default view.
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size_bytes: u64,
}

impl WgpuTexture {
    #[inline]
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Full-resource view (all mips and layers).
    #[inline]
    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// [`TextureDevice`] backed by a `wgpu::Device`.
pub struct WgpuTextureDevice {
    device: wgpu::Device,
    capabilities: DeviceCapabilities,
}

impl WgpuTextureDevice {
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        let capabilities = DeviceCapabilities {
            supports_uav: device.limits().max_storage_textures_per_shader_stage > 0,
            supports_fast_vram: false,
            supports_transient_aliasing: false,
        };
        Self {
            device,
            capabilities,
        }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn check_limits(&self, info: &TextureCreateInfo<'_>) -> Result<()> {
        let limits = self.device.limits();
        let (width, height, depth) = info.shape.mip0_extent();

        let fits = match info.shape {
            TextureShape::D3 { .. } => {
                let max = limits.max_texture_dimension_3d;
                width <= max && height <= max && depth <= max
            }
            _ => {
                let max = limits.max_texture_dimension_2d;
                width <= max && height <= max && info.shape.layer_count() <= limits.max_texture_array_layers
            }
        };

        if fits {
            Ok(())
        } else {
            Err(PoolError::TextureCreationFailed {
                label: info.label.to_string(),
                reason: format!("{:?} exceeds device texture limits", info.shape),
            })
        }
    }
}

impl TextureDevice for WgpuTextureDevice {
    type Texture = WgpuTexture;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_texture(&self, info: &TextureCreateInfo<'_>) -> Result<WgpuTexture> {
        self.check_limits(info)?;

        let (size, dimension, view_dimension) = match info.shape {
            TextureShape::D2 { width, height } => (
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                wgpu::TextureDimension::D2,
                wgpu::TextureViewDimension::D2,
            ),
            TextureShape::D2Array {
                width,
                height,
                layers,
            } => (
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: layers,
                },
                wgpu::TextureDimension::D2,
                wgpu::TextureViewDimension::D2Array,
            ),
            TextureShape::D3 {
                width,
                height,
                depth,
            } => (
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: depth,
                },
                wgpu::TextureDimension::D3,
                wgpu::TextureViewDimension::D3,
            ),
            TextureShape::Cube { size } => (
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6,
                },
                wgpu::TextureDimension::D2,
                wgpu::TextureViewDimension::Cube,
            ),
            TextureShape::CubeArray { size, cubes } => (
                wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6 * cubes,
                },
                wgpu::TextureDimension::D2,
                wgpu::TextureViewDimension::CubeArray,
            ),
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(info.label),
            size,
            mip_level_count: info.mip_count,
            sample_count: info.sample_count,
            dimension,
            format: info.format,
            usage: texture_usages(info),
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(info.label),
            dimension: Some(view_dimension),
            ..Default::default()
        });

        Ok(WgpuTexture {
            texture,
            view,
            size_bytes: info.estimated_size(),
        })
    }

    fn texture_memory_size(&self, texture: &WgpuTexture) -> u64 {
        texture.size_bytes
    }

    fn set_debug_name(&self, texture: &WgpuTexture, name: &str) {
        // wgpu labels are fixed at creation.
        log::trace!("Render target {:?} now used as '{name}'", texture.texture);
    }

    fn discard_transient(&self, _texture: &WgpuTexture) {}

    fn acquire_transient(&self, _texture: &WgpuTexture) {}

    fn transition_writable(&self, _texture: &WgpuTexture) {}
}

fn texture_usages(info: &TextureCreateInfo<'_>) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::empty();

    if info
        .usage
        .intersects(TargetableFlags::RENDER_TARGETABLE | TargetableFlags::DEPTH_STENCIL_TARGETABLE)
    {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if info.usage.contains(TargetableFlags::UAV) {
        usages |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if info.usage.contains(TargetableFlags::SHADER_RESOURCE) {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    // Multisampled and depth-stencil textures cannot take part in copies.
    if info.sample_count == 1 && !info.format.is_depth_stencil_format() {
        usages |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
    }

    usages
}
