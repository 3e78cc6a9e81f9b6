//! Pooled Render Target Handles
//!
//! A [`PooledRenderTarget`] is a reference-counted handle to one pooled
//! element: the device texture (or targetable + shader-resource pair), its
//! descriptor, and the bookkeeping the pool needs for reuse and eviction.
//!
//! # Reference Counting
//!
//! The pool keeps one handle per element; every handle given to a consumer is
//! a clone of it. Cloning is `AddRef` and dropping is `Release`, both plain
//! `Rc` operations. The handle is `!Send`, so all of this stays on the thread
//! that owns the pool.
//!
//! An element is *free* when only the pool's handle is left. When a release
//! leaves an element free and the element is transient and still tracked, its
//! physical memory is discarded on the device and the frame is recorded.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::desc::RenderTargetDesc;
use crate::device::TextureDevice;

/// State shared between a pool and the elements it tracks.
pub(crate) struct PoolShared<D: TextureDevice> {
    pub(crate) device: D,
    pub(crate) frame_number: Cell<u64>,
}

impl<D: TextureDevice> PoolShared<D> {
    pub(crate) fn new(device: D) -> Self {
        Self {
            device,
            frame_number: Cell::new(0),
        }
    }
}

// ─── Render Target Item ───────────────────────────────────────────────────────

/// The device textures behind a pooled render target.
///
/// Multisampled targets (and targets created with
/// [`TextureFlags::SEPARATE_SHADER_RESOURCE`](crate::desc::TextureFlags::SEPARATE_SHADER_RESOURCE))
/// carry a second, single-sample texture that shaders read from.
#[derive(Debug)]
pub struct RenderTargetItem<T> {
    targetable: T,
    shader_resource: Option<T>,
}

impl<T> RenderTargetItem<T> {
    #[must_use]
    pub fn new(targetable: T) -> Self {
        Self {
            targetable,
            shader_resource: None,
        }
    }

    #[must_use]
    pub fn with_shader_resource(targetable: T, shader_resource: T) -> Self {
        Self {
            targetable,
            shader_resource: Some(shader_resource),
        }
    }

    /// The texture bound as render / depth-stencil / UAV target.
    #[inline]
    #[must_use]
    pub fn targetable_texture(&self) -> &T {
        &self.targetable
    }

    /// The texture shaders sample. Same as the targetable texture unless a
    /// separate one exists.
    #[inline]
    #[must_use]
    pub fn shader_resource_texture(&self) -> &T {
        self.shader_resource.as_ref().unwrap_or(&self.targetable)
    }

    #[inline]
    #[must_use]
    pub fn has_separate_shader_resource(&self) -> bool {
        self.shader_resource.is_some()
    }

    pub(crate) fn textures(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.targetable).chain(self.shader_resource.as_ref())
    }
}

// ─── Element ──────────────────────────────────────────────────────────────────

struct RenderTargetElement<D: TextureDevice> {
    desc: RenderTargetDesc,
    debug_name: RefCell<String>,
    item: RenderTargetItem<D::Texture>,
    memory_size: u64,
    unused_for_frames: Cell<u32>,
    last_discard_frame: Cell<Option<u64>>,
    /// `None` for untracked elements and after the pool let go of the element.
    pool: RefCell<Option<Rc<PoolShared<D>>>>,
}

impl<D: TextureDevice> RenderTargetElement<D> {
    /// Runs when a release leaves the pool's handle as the only one.
    fn on_released_to_pool(&self) {
        if !self.desc.is_transient() {
            return;
        }
        let pool = self.pool.borrow();
        if let Some(shared) = pool.as_ref() {
            for texture in self.item.textures() {
                shared.device.discard_transient(texture);
            }
            self.last_discard_frame.set(Some(shared.frame_number.get()));
        }
    }
}

impl<D: TextureDevice> Drop for RenderTargetElement<D> {
    fn drop(&mut self) {
        log::trace!(
            "Destroying render target '{}' {}",
            self.debug_name.get_mut(),
            self.desc
        );
    }
}

// ─── Handle ───────────────────────────────────────────────────────────────────

/// Reference-counted handle to a pooled render target.
pub struct PooledRenderTarget<D: TextureDevice> {
    element: Rc<RenderTargetElement<D>>,
}

impl<D: TextureDevice> PooledRenderTarget<D> {
    pub(crate) fn new_tracked(
        shared: &Rc<PoolShared<D>>,
        desc: RenderTargetDesc,
        debug_name: &str,
        item: RenderTargetItem<D::Texture>,
        memory_size: u64,
    ) -> Self {
        Self::with_pool(desc, debug_name, item, memory_size, Some(Rc::clone(shared)))
    }

    pub(crate) fn new_untracked(
        desc: RenderTargetDesc,
        debug_name: &str,
        item: RenderTargetItem<D::Texture>,
        memory_size: u64,
    ) -> Self {
        Self::with_pool(desc, debug_name, item, memory_size, None)
    }

    fn with_pool(
        desc: RenderTargetDesc,
        debug_name: &str,
        item: RenderTargetItem<D::Texture>,
        memory_size: u64,
        pool: Option<Rc<PoolShared<D>>>,
    ) -> Self {
        Self {
            element: Rc::new(RenderTargetElement {
                desc,
                debug_name: RefCell::new(debug_name.to_string()),
                item,
                memory_size,
                unused_for_frames: Cell::new(0),
                last_discard_frame: Cell::new(None),
                pool: RefCell::new(pool),
            }),
        }
    }

    /// The descriptor the element was created with.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &RenderTargetDesc {
        &self.element.desc
    }

    #[must_use]
    pub fn debug_name(&self) -> Ref<'_, str> {
        Ref::map(self.element.debug_name.borrow(), String::as_str)
    }

    /// Renames the element. Tracked elements also relabel their textures on
    /// the device.
    pub fn set_debug_name(&self, name: &str) {
        {
            let mut current = self.element.debug_name.borrow_mut();
            if current.as_str() == name {
                return;
            }
            current.clear();
            current.push_str(name);
        }

        if let Some(shared) = self.element.pool.borrow().as_ref() {
            for texture in self.element.item.textures() {
                shared.device.set_debug_name(texture, name);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn item(&self) -> &RenderTargetItem<D::Texture> {
        &self.element.item
    }

    /// Number of live handles to the element, the pool's included.
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.element)
    }

    /// Only the pool holds the element.
    #[inline]
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.ref_count() == 1
    }

    /// Owned by a pool's accounting. Untracked elements, and elements that
    /// outlived [`RenderTargetPool::release_all`](crate::RenderTargetPool::release_all),
    /// are never discarded, evicted or counted.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.element.pool.borrow().is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.element.desc.is_transient()
    }

    /// Device-reported size in bytes of the targetable texture plus the
    /// separate shader-resource texture, if any.
    #[inline]
    #[must_use]
    pub fn compute_memory_size(&self) -> u64 {
        self.element.memory_size
    }

    /// Memory size in KB, rounded up. This is the unit of pool accounting.
    #[inline]
    #[must_use]
    pub fn size_in_kb(&self) -> u64 {
        self.element.memory_size.div_ceil(1024)
    }

    /// Consecutive frame starts the element spent free.
    #[inline]
    #[must_use]
    pub fn unused_for_frames(&self) -> u32 {
        self.element.unused_for_frames.get()
    }

    #[must_use]
    pub fn last_discard_frame(&self) -> Option<u64> {
        self.element.last_discard_frame.get()
    }

    #[must_use]
    pub fn has_been_discarded_in_frame(&self, frame_number: u64) -> bool {
        self.element.last_discard_frame.get() == Some(frame_number)
    }

    /// Both handles refer to the same element.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.element, &other.element)
    }

    // ─── Pool-side operations ─────────────────────────────────────────────

    pub(crate) fn detach(&self) {
        self.element.pool.borrow_mut().take();
    }

    /// Frame-start aging: free elements get one frame older, referenced
    /// ones are reset.
    pub(crate) fn on_frame_start(&self) {
        let unused = &self.element.unused_for_frames;
        if self.is_free() {
            unused.set(unused.get().saturating_add(1));
        } else {
            debug_assert_eq!(
                unused.get(),
                0,
                "referenced render target '{}' has a non-zero idle counter",
                self.debug_name()
            );
            unused.set(0);
        }
    }

    pub(crate) fn reset_unused(&self) {
        self.element.unused_for_frames.set(0);
    }

    pub(crate) fn acquire_transient(&self) {
        if !self.is_transient() {
            return;
        }
        if let Some(shared) = self.element.pool.borrow().as_ref() {
            for texture in self.element.item.textures() {
                shared.device.acquire_transient(texture);
            }
        }
    }

    pub(crate) fn transition_writable(&self) {
        if let Some(shared) = self.element.pool.borrow().as_ref() {
            shared.device.transition_writable(&self.element.item.targetable);
        }
    }
}

impl<D: TextureDevice> Clone for PooledRenderTarget<D> {
    fn clone(&self) -> Self {
        Self {
            element: Rc::clone(&self.element),
        }
    }
}

impl<D: TextureDevice> Drop for PooledRenderTarget<D> {
    fn drop(&mut self) {
        // This handle and the pool's are the last two.
        if Rc::strong_count(&self.element) == 2 {
            self.element.on_released_to_pool();
        }
    }
}

// ─── Element View ─────────────────────────────────────────────────────────────

/// Read-only view of an element inside a pool.
///
/// Returned by [`RenderTargetPool::element`](crate::RenderTargetPool::element).
/// It borrows the pool's own handle and cannot be turned into a new one;
/// references are only handed out by `find_free_element`.
pub struct PooledElementView<'a, D: TextureDevice> {
    handle: &'a PooledRenderTarget<D>,
}

impl<'a, D: TextureDevice> PooledElementView<'a, D> {
    pub(crate) fn new(handle: &'a PooledRenderTarget<D>) -> Self {
        Self { handle }
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &'a RenderTargetDesc {
        self.handle.desc()
    }

    #[must_use]
    pub fn debug_name(&self) -> Ref<'a, str> {
        self.handle.debug_name()
    }

    #[inline]
    #[must_use]
    pub fn item(&self) -> &'a RenderTargetItem<D::Texture> {
        self.handle.item()
    }

    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.handle.ref_count()
    }

    #[inline]
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.handle.is_free()
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.handle.is_transient()
    }

    #[inline]
    #[must_use]
    pub fn size_in_kb(&self) -> u64 {
        self.handle.size_in_kb()
    }

    #[inline]
    #[must_use]
    pub fn unused_for_frames(&self) -> u32 {
        self.handle.unused_for_frames()
    }

    #[must_use]
    pub fn last_discard_frame(&self) -> Option<u64> {
        self.handle.last_discard_frame()
    }

    #[must_use]
    pub fn has_been_discarded_in_frame(&self, frame_number: u64) -> bool {
        self.handle.has_been_discarded_in_frame(frame_number)
    }

    /// `handle` refers to this element.
    #[inline]
    #[must_use]
    pub fn is_same_as(&self, handle: &PooledRenderTarget<D>) -> bool {
        self.handle.ptr_eq(handle)
    }
}

impl<D: TextureDevice> fmt::Debug for PooledElementView<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.handle, f)
    }
}

impl<D: TextureDevice> fmt::Debug for PooledRenderTarget<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledRenderTarget")
            .field("name", &&*self.debug_name())
            .field("desc", &format_args!("{}", self.element.desc))
            .field("ref_count", &self.ref_count())
            .field("size_kb", &self.size_in_kb())
            .field("unused_for_frames", &self.unused_for_frames())
            .finish()
    }
}
