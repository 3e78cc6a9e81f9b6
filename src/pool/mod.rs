//! Render Target Pool
//!
//! Caches GPU render targets between uses. Consumers ask for a target by
//! [`RenderTargetDesc`]; the pool hands out a free element with a matching
//! descriptor, or creates a new one on a miss.
//!
//! # Frame Model
//!
//! The pool is owned by one thread and driven once per frame:
//!
//! 1. [`RenderTargetPool::tick_pool_elements`] at frame start: ages free
//!    elements and evicts the oldest idle ones while the pool is over budget.
//! 2. [`RenderTargetPool::find_free_element`] during the frame, once per
//!    target a pass needs. Handles are kept in caller-owned slots
//!    (`Option<PooledRenderTarget<D>>`) and survive across frames.
//! 3. Consumers drop their handles when done; the element becomes free.
//!
//! # Budget
//!
//! Free elements are evicted only after sitting idle for more than
//! [`EVICTION_GRACE_FRAMES`] frames, and only while the pool holds more than
//! [`RenderTargetPoolSettings::min_pool_size_kb`]. Referenced elements are
//! never evicted; when nothing evictable is left the pool keeps running over
//! budget and says so once in the log.
//!
//! # Transient Aliasing
//!
//! On devices with transient memory, requests may be rewritten to transient
//! descriptors (see [`needs_transient_override`](crate::needs_transient_override)).
//! A transient element's memory is discarded whenever it becomes free and
//! re-acquired when it is handed out again.

pub mod element;
pub mod snapshot;
pub mod stats;

pub use element::{PooledElementView, PooledRenderTarget, RenderTargetItem};
pub use snapshot::{RenderTargetSnapshot, SnapshotArena};
pub use stats::{MemoryReport, MemoryReportEntry, PoolStats};

use std::rc::Rc;

use crate::desc::{DescMatch, RenderTargetDesc, TargetableFlags, match_passes};
use crate::device::{TextureCreateInfo, TextureDevice};
use crate::errors::Result;
use crate::settings::RenderTargetPoolSettings;
use crate::transience::{RenderTargetTransience, effective_desc};

use element::PoolShared;

/// Frames a free element is kept before it may be evicted.
pub const EVICTION_GRACE_FRAMES: u32 = 2;

/// Idle frames after which a free element counts as stale.
pub const STALE_FRAME_COUNT: u32 = 10;

/// Per-request options of [`RenderTargetPool::find_free_element_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Transition a reused element to a writable state before handing it out.
    pub writable_barrier: bool,
    pub transience: RenderTargetTransience,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            writable_barrier: true,
            transience: RenderTargetTransience::Transient,
        }
    }
}

/// Pool of reusable render targets on a [`TextureDevice`].
pub struct RenderTargetPool<D: TextureDevice> {
    shared: Rc<PoolShared<D>>,
    elements: Vec<Option<PooledRenderTarget<D>>>,
    allocation_level_kb: u64,
    settings: RenderTargetPoolSettings,
    currently_over_budget: bool,
}

impl<D: TextureDevice> RenderTargetPool<D> {
    pub fn new(device: D, settings: RenderTargetPoolSettings) -> Self {
        log::info!(
            "Render target pool created (budget {} KB, aliasing mode {})",
            settings.min_pool_size_kb,
            u8::from(settings.transient_aliasing_mode)
        );
        Self {
            shared: Rc::new(PoolShared::new(device)),
            elements: Vec::new(),
            allocation_level_kb: 0,
            settings,
            currently_over_budget: false,
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Makes `slot` hold a render target matching `desc`, with a writable
    /// barrier on reuse and a transient hint.
    ///
    /// Returns `Ok(true)` when the slot already held a matching target and
    /// was left as is, `Ok(false)` when a different element was bound.
    pub fn find_free_element(
        &mut self,
        desc: &RenderTargetDesc,
        slot: &mut Option<PooledRenderTarget<D>>,
        debug_name: &str,
    ) -> Result<bool> {
        self.find_free_element_with(desc, slot, debug_name, FindOptions::default())
    }

    /// [`find_free_element`](Self::find_free_element) with explicit options.
    ///
    /// # Panics
    ///
    /// Panics when a UAV target is requested from a device without UAV
    /// support.
    ///
    /// # Errors
    ///
    /// Device texture creation failures are returned unchanged. The slot is
    /// empty afterwards.
    pub fn find_free_element_with(
        &mut self,
        desc: &RenderTargetDesc,
        slot: &mut Option<PooledRenderTarget<D>>,
        debug_name: &str,
        options: FindOptions,
    ) -> Result<bool> {
        let caps = self.shared.device.capabilities();
        assert!(
            caps.supports_uav || !desc.targetable.contains(TargetableFlags::UAV),
            "UAV render target '{debug_name}' requested on a device without UAV support"
        );

        if !desc.is_valid() {
            log::warn!("Ignoring request for invalid render target '{debug_name}': {desc}");
            return Ok(true);
        }

        let desc = effective_desc(
            desc,
            options.transience,
            self.settings.transient_aliasing_mode,
            caps.supports_transient_aliasing,
        );

        if let Some(existing) = slot.as_ref()
            && existing.desc().matches(&desc, DescMatch::Exact)
        {
            existing.set_debug_name(debug_name);
            return Ok(true);
        }

        if let Some(old) = slot.take() {
            self.release_reference(old);
        }

        let (handle, reused) = match self.find_free(&desc, caps.supports_fast_vram) {
            Some(handle) => (handle, true),
            None => {
                let created = self.create_element(&desc, debug_name)?;
                self.elements.push(Some(created.clone()));
                (created, false)
            }
        };

        // The element was free until this handle; its pages come back first.
        if handle.is_transient() {
            handle.acquire_transient();
        }

        if reused {
            handle.reset_unused();
            handle.set_debug_name(debug_name);
            if options.writable_barrier {
                handle.transition_writable();
            }
            if self.settings.records_events_for(handle.size_in_kb()) {
                log::debug!("Reusing render target '{debug_name}' {}", handle.desc());
            }
        }

        *slot = Some(handle);
        Ok(false)
    }

    /// Wraps an externally created item in a handle without pool accounting.
    /// The element is never discarded, evicted or counted in the stats.
    pub fn create_untracked_element(
        &mut self,
        desc: &RenderTargetDesc,
        slot: &mut Option<PooledRenderTarget<D>>,
        item: RenderTargetItem<D::Texture>,
    ) {
        if let Some(old) = slot.take() {
            self.release_reference(old);
        }

        let device = &self.shared.device;
        let memory_size = item.textures().map(|texture| device.texture_memory_size(texture)).sum();

        *slot = Some(PooledRenderTarget::new_untracked(
            desc.clone(),
            &desc.debug_name,
            item,
            memory_size,
        ));
    }

    // ========================================================================
    // Release & Eviction
    // ========================================================================

    /// Drops the slot's reference and evicts the element right away when
    /// nothing else references it.
    pub fn free_unused_resource(&mut self, slot: &mut Option<PooledRenderTarget<D>>) {
        if let Some(handle) = slot.take() {
            self.release_reference(handle);
        }
    }

    /// Evicts every free element now, regardless of budget and idle time.
    pub fn free_unused_resources(&mut self) {
        let mut evicted = 0usize;
        for index in 0..self.elements.len() {
            if self.elements[index].as_ref().is_some_and(PooledRenderTarget::is_free) {
                self.evict_at(index);
                evicted += 1;
            }
        }
        self.compact_pool();

        log::info!(
            "Freed {evicted} unused render targets, {} KB still allocated",
            self.allocation_level_kb
        );
        self.verify_allocation_level();
    }

    /// Per-frame maintenance. Call once at frame start, before the frame's
    /// allocations.
    pub fn tick_pool_elements(&mut self) {
        let frame = self.shared.frame_number.get() + 1;
        self.shared.frame_number.set(frame);

        self.compact_pool();

        for element in self.elements.iter().flatten() {
            element.on_frame_start();
        }

        let budget = self.settings.min_pool_size_kb;
        while self.allocation_level_kb > budget {
            let Some(index) = self.oldest_evictable() else {
                if !self.currently_over_budget {
                    log::warn!(
                        "Render target pool over budget: {} KB allocated, {} KB allowed, nothing left to evict",
                        self.allocation_level_kb,
                        budget
                    );
                    self.currently_over_budget = true;
                }
                break;
            };
            self.evict_at(index);
        }

        if self.currently_over_budget && self.allocation_level_kb <= budget {
            log::info!(
                "Render target pool back under budget: {} KB allocated",
                self.allocation_level_kb
            );
            self.currently_over_budget = false;
        }

        if self.settings.evict_stale_without_pressure {
            for index in 0..self.elements.len() {
                let stale = self.elements[index].as_ref().is_some_and(|element| {
                    element.is_free() && element.unused_for_frames() > STALE_FRAME_COUNT
                });
                if stale {
                    self.evict_at(index);
                }
            }
        }

        self.compact_pool();
        self.verify_allocation_level();
    }

    /// Drops every element. Handles still held by consumers stay valid but
    /// become untracked.
    pub fn release_all(&mut self) {
        let count = self.elements.iter().flatten().count();
        for element in self.elements.drain(..).flatten() {
            element.detach();
        }
        if count > 0 {
            log::info!(
                "Released all {count} render targets ({} KB)",
                self.allocation_level_kb
            );
        }
        self.allocation_level_kb = 0;
        self.currently_over_budget = false;
    }

    /// Issues writable transitions for free, auto-writable, targetable
    /// elements ahead of the frame.
    pub fn transition_free_targets_writable(&self) {
        for element in self.elements.iter().flatten() {
            let desc = element.desc();
            if element.is_free() && desc.auto_writable && desc.is_targetable() {
                element.transition_writable();
            }
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn get_stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        for element in self.elements.iter().flatten() {
            stats.element_count += 1;
            stats.pool_size_kb += element.size_in_kb();
            if !element.is_free() {
                stats.used_size_kb += element.size_in_kb();
            }
        }
        stats
    }

    #[must_use]
    pub fn memory_report(&self) -> MemoryReport {
        let entries = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|element| (index, element)))
            .map(|(index, element)| MemoryReportEntry {
                index,
                debug_name: element.debug_name().to_string(),
                desc: element.desc().to_string(),
                format: element.desc().format,
                size_kb: element.size_in_kb(),
                unused_for_frames: element.unused_for_frames(),
                is_free: element.is_free(),
                is_transient: element.is_transient(),
            })
            .collect();

        MemoryReport {
            frame_number: self.frame_number(),
            budget_kb: self.settings.min_pool_size_kb,
            entries,
        }
    }

    /// Logs [`memory_report`](Self::memory_report) at `info` level.
    pub fn dump_memory_usage(&self) {
        log::info!("{}", self.memory_report());
    }

    /// Number of slots, including ones emptied since the last compaction.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Inspects the element in slot `index`. The view cannot produce a
    /// handle:
    ///
    /// ```compile_fail
    /// use myth_rtpool::{HeadlessDevice, RenderTargetPool, RenderTargetPoolSettings};
    ///
    /// let pool = RenderTargetPool::new(HeadlessDevice::new(), RenderTargetPoolSettings::default());
    /// let handle = pool.element(0).unwrap().clone();
    /// ```
    #[must_use]
    pub fn element(&self, index: usize) -> Option<PooledElementView<'_, D>> {
        self.elements.get(index).and_then(Option::as_ref).map(PooledElementView::new)
    }

    /// Slot index of the element behind `handle`, if the pool tracks it.
    #[must_use]
    pub fn find_index(&self, handle: &PooledRenderTarget<D>) -> Option<usize> {
        self.elements
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|element| element.ptr_eq(handle)))
    }

    /// Frames ticked so far.
    #[must_use]
    pub fn frame_number(&self) -> u64 {
        self.shared.frame_number.get()
    }

    #[must_use]
    pub fn allocation_level_kb(&self) -> u64 {
        self.allocation_level_kb
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.allocation_level_kb > self.settings.min_pool_size_kb
    }

    /// A tick found the pool over budget with nothing left to evict, and no
    /// later tick has brought it back under.
    #[must_use]
    pub fn is_over_budget_warning_active(&self) -> bool {
        self.currently_over_budget
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.shared.device
    }

    #[must_use]
    pub fn settings(&self) -> &RenderTargetPoolSettings {
        &self.settings
    }

    /// Replaces the settings. A lower budget takes effect at the next tick.
    pub fn set_settings(&mut self, settings: RenderTargetPoolSettings) {
        if settings != self.settings {
            log::info!("Render target pool settings changed: {settings:?}");
        }
        self.settings = settings;
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// First free element matching `desc`, trying each matching pass in turn.
    /// Returns a new handle to it.
    fn find_free(&self, desc: &RenderTargetDesc, supports_fast_vram: bool) -> Option<PooledRenderTarget<D>> {
        let frame = self.frame_number();
        let skip_discarded = desc.is_transient() && !self.settings.allow_multiple_discards_per_frame;

        match_passes(desc, supports_fast_vram).into_iter().find_map(|rule| {
            self.elements.iter().flatten().find(|element| {
                element.is_free()
                    && rule.matches(element.desc(), desc)
                    && !(skip_discarded && element.has_been_discarded_in_frame(frame))
            })
        })
        .cloned()
    }

    fn create_element(&mut self, desc: &RenderTargetDesc, debug_name: &str) -> Result<PooledRenderTarget<D>> {
        let device = &self.shared.device;
        let caps = device.capabilities();

        let item = if desc.uses_separate_shader_resource() {
            let mut targetable = TextureCreateInfo::for_desc(desc, debug_name, caps);
            targetable.usage.remove(TargetableFlags::SHADER_RESOURCE);
            let targetable = device.create_texture(&targetable)?;

            let label = format!("{debug_name} (shader resource)");
            let mut shader_resource = TextureCreateInfo::for_desc(desc, &label, caps);
            shader_resource.sample_count = 1;
            // Resolve destination of the targetable texture.
            shader_resource.usage = TargetableFlags::SHADER_RESOURCE
                | (desc.targetable
                    & (TargetableFlags::RENDER_TARGETABLE | TargetableFlags::DEPTH_STENCIL_TARGETABLE));
            shader_resource.fast_vram = false;
            let shader_resource = device.create_texture(&shader_resource)?;

            RenderTargetItem::with_shader_resource(targetable, shader_resource)
        } else {
            let info = TextureCreateInfo::for_desc(desc, debug_name, caps);
            RenderTargetItem::new(device.create_texture(&info)?)
        };

        let memory_size = item.textures().map(|texture| device.texture_memory_size(texture)).sum();

        let element = PooledRenderTarget::new_tracked(&self.shared, desc.clone(), debug_name, item, memory_size);
        self.allocation_level_kb += element.size_in_kb();

        if self.settings.records_events_for(element.size_in_kb()) {
            log::debug!(
                "Allocated render target '{debug_name}' {desc} ({} KB, pool {} KB)",
                element.size_in_kb(),
                self.allocation_level_kb
            );
        }

        Ok(element)
    }

    /// Drops a consumer reference and evicts the element if that left it free.
    fn release_reference(&mut self, handle: PooledRenderTarget<D>) {
        let index = self.find_index(&handle);
        drop(handle);

        if let Some(index) = index
            && self.elements[index].as_ref().is_some_and(PooledRenderTarget::is_free)
        {
            self.evict_at(index);
        }
    }

    /// Among free elements past the grace period, the one idle the longest.
    /// Ties go to the lowest index, the oldest allocation.
    fn oldest_evictable(&self) -> Option<usize> {
        let mut oldest: Option<(usize, u32)> = None;
        for (index, slot) in self.elements.iter().enumerate() {
            let Some(element) = slot else { continue };
            let unused = element.unused_for_frames();
            if element.is_free()
                && unused > EVICTION_GRACE_FRAMES
                && oldest.is_none_or(|(_, best)| unused > best)
            {
                oldest = Some((index, unused));
            }
        }
        oldest.map(|(index, _)| index)
    }

    fn evict_at(&mut self, index: usize) {
        let Some(element) = self.elements[index].take() else {
            return;
        };
        debug_assert!(element.is_free(), "evicting a referenced render target");

        let size_kb = element.size_in_kb();
        self.allocation_level_kb -= size_kb;

        if self.settings.records_events_for(size_kb) {
            log::debug!(
                "Evicted render target '{}' {} ({size_kb} KB, idle {} frames)",
                element.debug_name(),
                element.desc(),
                element.unused_for_frames()
            );
        }

        element.detach();
    }

    fn compact_pool(&mut self) {
        self.elements.retain(Option::is_some);
    }

    fn verify_allocation_level(&self) {
        debug_assert_eq!(
            self.elements
                .iter()
                .flatten()
                .map(PooledRenderTarget::size_in_kb)
                .sum::<u64>(),
            self.allocation_level_kb,
            "render target pool allocation level out of sync"
        );
    }
}

impl<D: TextureDevice> Drop for RenderTargetPool<D> {
    fn drop(&mut self) {
        self.release_all();
    }
}
