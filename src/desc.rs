//! Render Target Descriptors
//!
//! A [`RenderTargetDesc`] describes the shape, format and capabilities of a
//! pooled render target. It is the key the pool matches requests against.
//!
//! # Matching
//!
//! Matching is expressed as an ordered list of [`DescMatch`] predicates
//! (see [`match_passes`]): the pool first looks for an exact match, and only
//! when that fails and the device has fast VRAM does it retry while ignoring
//! the [`TextureFlags::FAST_VRAM`] hint. The debug name never takes part in
//! matching.
//!
//! ```rust,ignore
//! use myth_rtpool::desc::{RenderTargetDesc, TargetableFlags, TextureFlags};
//!
//! let scene_color = RenderTargetDesc::new_2d(
//!     1920,
//!     1080,
//!     wgpu::TextureFormat::Rgba16Float,
//!     TargetableFlags::RENDER_TARGETABLE | TargetableFlags::SHADER_RESOURCE,
//! )
//! .with_flags(TextureFlags::FAST_VRAM)
//! .with_clear_value(ClearValue::Color([0.0, 0.0, 0.0, 1.0]));
//! ```

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

// ─── Flags ────────────────────────────────────────────────────────────────────

bitflags! {
    /// How a render target may be bound by the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TargetableFlags: u32 {
        /// Usable as a color attachment.
        const RENDER_TARGETABLE = 1 << 0;
        /// Usable as a depth-stencil attachment.
        const DEPTH_STENCIL_TARGETABLE = 1 << 1;
        /// Usable as an unordered-access (storage) texture.
        const UAV = 1 << 2;
        /// Sampled in shaders.
        const SHADER_RESOURCE = 1 << 3;
    }
}

impl Default for TargetableFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Creation hints that do not change how the target is bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        /// Prefer fast on-chip memory where the device has it.
        const FAST_VRAM = 1 << 0;
        /// Physical memory may be discarded and re-acquired between uses.
        const TRANSIENT = 1 << 1;
        /// Always create a separate shader-resource texture next to the
        /// targetable one (it is implied by multisampling).
        const SEPARATE_SHADER_RESOURCE = 1 << 2;
    }
}

impl Default for TextureFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Dimension & Clear Value ──────────────────────────────────────────────────

/// Dimensionality of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTargetDimension {
    #[default]
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
}

impl RenderTargetDimension {
    #[inline]
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self, Self::Texture2DArray | Self::TextureCubeArray)
    }

    #[inline]
    #[must_use]
    pub fn is_cube(self) -> bool {
        matches!(self, Self::TextureCube | Self::TextureCubeArray)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Texture2D => "2D",
            Self::Texture2DArray => "2DArray",
            Self::Texture3D => "3D",
            Self::TextureCube => "Cube",
            Self::TextureCubeArray => "CubeArray",
        }
    }
}

/// Optimized clear value bound to a render target at creation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue {
    #[default]
    None,
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

// ─── Descriptor ───────────────────────────────────────────────────────────────

/// Describes a pooled render target.
///
/// Every field except `debug_name` participates in matching. Fields that do
/// not apply to the dimension (`depth` outside 3D, `array_size` outside
/// arrays) are kept at `1` by the constructors.
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub dimension: RenderTargetDimension,
    pub width: u32,
    pub height: u32,
    /// Depth of a 3D target.
    pub depth: u32,
    /// Layer count of a 2D array, or cube count of a cube array.
    pub array_size: u32,
    pub format: wgpu::TextureFormat,
    pub mip_count: u32,
    pub sample_count: u32,
    pub targetable: TargetableFlags,
    pub flags: TextureFlags,
    pub clear_value: ClearValue,
    /// Free targets with this flag are moved to the writable state by
    /// [`RenderTargetPool::transition_free_targets_writable`](crate::RenderTargetPool::transition_free_targets_writable).
    pub auto_writable: bool,
    pub debug_name: Cow<'static, str>,
}

impl RenderTargetDesc {
    fn base(
        dimension: RenderTargetDimension,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        targetable: TargetableFlags,
    ) -> Self {
        Self {
            dimension,
            width,
            height,
            depth: 1,
            array_size: 1,
            format,
            mip_count: 1,
            sample_count: 1,
            targetable,
            flags: TextureFlags::empty(),
            clear_value: ClearValue::None,
            auto_writable: true,
            debug_name: Cow::Borrowed(""),
        }
    }

    /// Creates a 2D render target descriptor.
    #[must_use]
    pub fn new_2d(
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        targetable: TargetableFlags,
    ) -> Self {
        Self::base(RenderTargetDimension::Texture2D, width, height, format, targetable)
    }

    /// Creates a 2D array descriptor with `layers` slices.
    #[must_use]
    pub fn new_2d_array(
        width: u32,
        height: u32,
        layers: u32,
        format: wgpu::TextureFormat,
        targetable: TargetableFlags,
    ) -> Self {
        Self {
            array_size: layers,
            ..Self::base(RenderTargetDimension::Texture2DArray, width, height, format, targetable)
        }
    }

    /// Creates a volume (3D) descriptor.
    #[must_use]
    pub fn new_volume(
        width: u32,
        height: u32,
        depth: u32,
        format: wgpu::TextureFormat,
        targetable: TargetableFlags,
    ) -> Self {
        Self {
            depth,
            ..Self::base(RenderTargetDimension::Texture3D, width, height, format, targetable)
        }
    }

    /// Creates a cube map descriptor with square faces of `size`.
    #[must_use]
    pub fn new_cube(size: u32, format: wgpu::TextureFormat, targetable: TargetableFlags) -> Self {
        Self::base(RenderTargetDimension::TextureCube, size, size, format, targetable)
    }

    /// Creates a cube map array descriptor holding `cubes` cube maps.
    #[must_use]
    pub fn new_cube_array(
        size: u32,
        cubes: u32,
        format: wgpu::TextureFormat,
        targetable: TargetableFlags,
    ) -> Self {
        Self {
            array_size: cubes,
            ..Self::base(RenderTargetDimension::TextureCubeArray, size, size, format, targetable)
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: TextureFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_clear_value(mut self, clear_value: ClearValue) -> Self {
        self.clear_value = clear_value;
        self
    }

    #[must_use]
    pub fn with_mips(mut self, mip_count: u32) -> Self {
        self.mip_count = mip_count;
        self
    }

    #[must_use]
    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    #[must_use]
    pub fn with_auto_writable(mut self, auto_writable: bool) -> Self {
        self.auto_writable = auto_writable;
        self
    }

    #[must_use]
    pub fn with_debug_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.debug_name = name.into();
        self
    }

    /// Returns `false` for descriptors no texture can be created from:
    /// empty extent, zero mips or layers, non-square cube faces, or an
    /// unsupported sample count. Multisampling is limited to 2..=8 samples
    /// on plain single-mip 2D targets.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.sample_count != 1
            && (!(2..=8).contains(&self.sample_count)
                || self.dimension != RenderTargetDimension::Texture2D)
        {
            return false;
        }
        // Multisampled textures have a single mip.
        if self.sample_count > 1 && self.mip_count != 1 {
            return false;
        }

        let depth_ok = self.dimension != RenderTargetDimension::Texture3D || self.depth > 0;
        let layers_ok = !self.dimension.is_array() || self.array_size > 0;
        let cube_ok = !self.dimension.is_cube() || self.width == self.height;

        self.width > 0 && self.height > 0 && self.mip_count > 0 && depth_ok && layers_ok && cube_ok
    }

    /// Number of array layers the texture is created with (6 per cube).
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match self.dimension {
            RenderTargetDimension::Texture2D | RenderTargetDimension::Texture3D => 1,
            RenderTargetDimension::Texture2DArray => self.array_size,
            RenderTargetDimension::TextureCube => 6,
            RenderTargetDimension::TextureCubeArray => 6 * self.array_size,
        }
    }

    /// Render, depth-stencil or UAV bindable.
    #[inline]
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.targetable.intersects(
            TargetableFlags::RENDER_TARGETABLE
                | TargetableFlags::DEPTH_STENCIL_TARGETABLE
                | TargetableFlags::UAV,
        )
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.flags.contains(TextureFlags::TRANSIENT)
    }

    /// Targetable descriptors that are multisampled or explicitly ask for it
    /// get a second, single-sample texture for shader reads.
    #[must_use]
    pub fn uses_separate_shader_resource(&self) -> bool {
        self.is_targetable()
            && (self.sample_count > 1 || self.flags.contains(TextureFlags::SEPARATE_SHADER_RESOURCE))
    }

    /// Compares two descriptors under the given matching rule.
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Self, rule: DescMatch) -> bool {
        rule.matches(other, self)
    }
}

impl PartialEq for RenderTargetDesc {
    fn eq(&self, other: &Self) -> bool {
        DescMatch::Exact.matches(self, other)
    }
}

impl fmt::Display for RenderTargetDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}x{}", self.dimension.label(), self.width, self.height)?;
        match self.dimension {
            RenderTargetDimension::Texture3D => write!(f, "x{}", self.depth)?,
            RenderTargetDimension::Texture2DArray | RenderTargetDimension::TextureCubeArray => {
                write!(f, "[{}]", self.array_size)?;
            }
            _ => {}
        }
        write!(f, " {:?}", self.format)?;
        if self.mip_count > 1 {
            write!(f, " Mips:{}", self.mip_count)?;
        }
        if self.sample_count > 1 {
            write!(f, " MSAA:{}", self.sample_count)?;
        }
        if self.targetable.contains(TargetableFlags::RENDER_TARGETABLE) {
            f.write_str(" RT")?;
        }
        if self.targetable.contains(TargetableFlags::DEPTH_STENCIL_TARGETABLE) {
            f.write_str(" DS")?;
        }
        if self.targetable.contains(TargetableFlags::UAV) {
            f.write_str(" UAV")?;
        }
        if self.targetable.contains(TargetableFlags::SHADER_RESOURCE) {
            f.write_str(" SRV")?;
        }
        if self.flags.contains(TextureFlags::FAST_VRAM) {
            f.write_str(" FastVRAM")?;
        }
        if self.is_transient() {
            f.write_str(" Transient")?;
        }
        Ok(())
    }
}

// ─── Matching ─────────────────────────────────────────────────────────────────

/// A descriptor matching rule, evaluated in priority order by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescMatch {
    /// Every field except the debug name must be equal.
    Exact,
    /// Like [`Exact`](Self::Exact) but the fast-VRAM hint is ignored, so a
    /// target created in regular memory can serve a fast-VRAM request.
    IgnoreFastVram,
}

impl DescMatch {
    /// Returns `true` when `candidate` can serve a request for `requested`.
    #[must_use]
    pub fn matches(self, candidate: &RenderTargetDesc, requested: &RenderTargetDesc) -> bool {
        let ignored = match self {
            Self::Exact => TextureFlags::empty(),
            Self::IgnoreFastVram => TextureFlags::FAST_VRAM,
        };

        candidate.dimension == requested.dimension
            && candidate.width == requested.width
            && candidate.height == requested.height
            && candidate.depth == requested.depth
            && candidate.array_size == requested.array_size
            && candidate.format == requested.format
            && candidate.mip_count == requested.mip_count
            && candidate.sample_count == requested.sample_count
            && candidate.targetable == requested.targetable
            && candidate.flags.difference(ignored) == requested.flags.difference(ignored)
            && candidate.clear_value == requested.clear_value
            && candidate.auto_writable == requested.auto_writable
    }
}

/// The matching passes to run for a request, in priority order.
///
/// The relaxed pass only runs for fast-VRAM requests on devices that have
/// fast VRAM; elsewhere the hint never reaches the device, so an exact
/// match is the only meaningful one.
#[must_use]
pub fn match_passes(requested: &RenderTargetDesc, supports_fast_vram: bool) -> SmallVec<[DescMatch; 2]> {
    let mut passes = SmallVec::new();
    passes.push(DescMatch::Exact);
    if supports_fast_vram && requested.flags.contains(TextureFlags::FAST_VRAM) {
        passes.push(DescMatch::IgnoreFastVram);
    }
    passes
}
