//! Transient Aliasing Decision
//!
//! Decides whether a request should be served by a transient render target,
//! i.e. one whose physical memory the device may discard between uses and
//! share with other transient targets.
//!
//! The decision is a pure function of the descriptor, the caller's hint, the
//! configured [`TransientAliasingMode`] and the device capability. When it
//! says yes, the pool matches and allocates against the descriptor with
//! [`TextureFlags::TRANSIENT`] set.

use crate::desc::{RenderTargetDesc, TextureFlags};
use crate::settings::TransientAliasingMode;

/// Caller hint about the expected lifetime of a requested target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTargetTransience {
    /// Contents are only needed within the current frame.
    #[default]
    Transient,
    /// Contents must survive until the next use.
    NonTransient,
}

/// Returns `true` when `desc` should be turned into a transient target.
///
/// | Mode                | Transient when                      |
/// |---------------------|-------------------------------------|
/// | `Disabled`          | never                               |
/// | `FastVramOnly`      | the fast-VRAM flag is set           |
/// | `FastVramAndHinted` | fast-VRAM flag or hint is transient |
/// | `AllTargets`        | always                              |
///
/// Regardless of mode the answer is `false` without device support, for
/// descriptors that are not render, depth-stencil or UAV targetable, and for
/// descriptors that are already transient.
#[must_use]
pub fn needs_transient_override(
    desc: &RenderTargetDesc,
    hint: RenderTargetTransience,
    mode: TransientAliasingMode,
    supports_aliasing: bool,
) -> bool {
    if !supports_aliasing || !desc.is_targetable() || desc.is_transient() {
        return false;
    }

    let fast_vram = desc.flags.contains(TextureFlags::FAST_VRAM);
    match mode {
        TransientAliasingMode::Disabled => false,
        TransientAliasingMode::FastVramOnly => fast_vram,
        TransientAliasingMode::FastVramAndHinted => {
            fast_vram || hint == RenderTargetTransience::Transient
        }
        TransientAliasingMode::AllTargets => true,
    }
}

/// The descriptor the pool works with for this request: `desc` itself, or a
/// copy with the transient flag added.
#[must_use]
pub(crate) fn effective_desc(
    desc: &RenderTargetDesc,
    hint: RenderTargetTransience,
    mode: TransientAliasingMode,
    supports_aliasing: bool,
) -> RenderTargetDesc {
    let mut effective = desc.clone();
    if needs_transient_override(desc, hint, mode, supports_aliasing) {
        effective.flags |= TextureFlags::TRANSIENT;
    }
    effective
}
