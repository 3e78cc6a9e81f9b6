//! Frame-Scoped Snapshots
//!
//! Parallel workers must not touch a handle's reference count, so they read
//! pooled targets through snapshots instead: read-only views allocated from a
//! [`bumpalo`] arena that lives for one frame.
//!
//! A snapshot borrows the descriptor and textures of the handle it was taken
//! from and copies its debug name into the arena. It reports a fixed
//! reference count of 1, is never free, and never takes part in eviction.
//! [`SnapshotArena::reset`] needs `&mut self`, so it cannot run while any
//! snapshot is still borrowed.
//!
//! ```rust,ignore
//! let mut arena = SnapshotArena::new();
//! let views: Vec<_> = targets.iter().map(|rt| arena.snapshot(rt)).collect();
//! std::thread::scope(|s| {
//!     for view in &views {
//!         s.spawn(move || record_pass(view.item().targetable_texture()));
//!     }
//! });
//! drop(views);
//! arena.reset();
//! ```

use std::cell::Cell;

use bumpalo::Bump;

use crate::desc::RenderTargetDesc;
use crate::device::TextureDevice;
use crate::pool::element::{PooledRenderTarget, RenderTargetItem};

/// Read-only view of a pooled render target.
///
/// `Sync` whenever the device texture type is.
#[derive(Debug)]
pub struct RenderTargetSnapshot<'a, T> {
    desc: &'a RenderTargetDesc,
    debug_name: &'a str,
    item: &'a RenderTargetItem<T>,
    memory_size: u64,
    unused_for_frames: u32,
}

impl<'a, T> RenderTargetSnapshot<'a, T> {
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &'a RenderTargetDesc {
        self.desc
    }

    #[inline]
    #[must_use]
    pub fn debug_name(&self) -> &'a str {
        self.debug_name
    }

    #[inline]
    #[must_use]
    pub fn item(&self) -> &'a RenderTargetItem<T> {
        self.item
    }

    /// Always 1.
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> usize {
        1
    }

    /// Always `false`.
    #[inline]
    #[must_use]
    pub fn is_free(&self) -> bool {
        false
    }

    #[must_use]
    pub fn compute_memory_size(&self) -> u64 {
        self.memory_size
    }

    #[must_use]
    pub fn size_in_kb(&self) -> u64 {
        self.memory_size.div_ceil(1024)
    }

    #[must_use]
    pub fn unused_for_frames(&self) -> u32 {
        self.unused_for_frames
    }
}

/// Bump arena holding one frame's snapshots.
#[derive(Default)]
pub struct SnapshotArena {
    bump: Bump,
    count: Cell<usize>,
}

impl SnapshotArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Bump::with_capacity(bytes),
            count: Cell::new(0),
        }
    }

    /// Takes a snapshot of `handle`. The handle stays borrowed for as long as
    /// the snapshot is.
    pub fn snapshot<'a, D: TextureDevice>(
        &'a self,
        handle: &'a PooledRenderTarget<D>,
    ) -> &'a RenderTargetSnapshot<'a, D::Texture> {
        let debug_name = self.bump.alloc_str(&handle.debug_name());
        self.count.set(self.count.get() + 1);

        self.bump.alloc(RenderTargetSnapshot {
            desc: handle.desc(),
            debug_name,
            item: handle.item(),
            memory_size: handle.compute_memory_size(),
            unused_for_frames: handle.unused_for_frames(),
        })
    }

    /// Snapshots taken since the last reset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by the arena's chunks.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Frees every snapshot at once. Keeps the largest chunk for reuse.
    pub fn reset(&mut self) {
        self.bump.reset();
        self.count.set(0);
    }
}
