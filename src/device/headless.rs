//! Headless Texture Device
//!
//! A [`TextureDevice`] without a GPU. Textures are plain bookkeeping objects
//! whose size is estimated from their creation info, and every device call is
//! appended to an event log that tests and tools can inspect. Recording can
//! be switched off for long runs.
//!
//! The capabilities are configurable, so fast-VRAM and transient-aliasing
//! code paths can be exercised on any machine.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::desc::TargetableFlags;
use crate::device::{DeviceCapabilities, TextureCreateInfo, TextureDevice, TextureShape};
use crate::errors::{PoolError, Result};

/// A device call recorded by [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Created {
        texture: u64,
        label: String,
        size_bytes: u64,
    },
    Renamed {
        texture: u64,
        label: String,
    },
    Discarded {
        texture: u64,
    },
    Acquired {
        texture: u64,
    },
    TransitionedWritable {
        texture: u64,
    },
}

/// Texture created by [`HeadlessDevice`].
#[derive(Debug)]
pub struct HeadlessTexture {
    id: u64,
    shape: TextureShape,
    format: wgpu::TextureFormat,
    sample_count: u32,
    usage: TargetableFlags,
    size_bytes: u64,
    live: Arc<AtomicUsize>,
}

impl HeadlessTexture {
    /// Unique id within the creating device, starting at 1.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn shape(&self) -> TextureShape {
        self.shape
    }

    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Usage flags the texture was created with.
    #[must_use]
    pub fn usage(&self) -> TargetableFlags {
        self.usage
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

impl Drop for HeadlessTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

/// In-memory texture device.
#[derive(Debug)]
pub struct HeadlessDevice {
    capabilities: DeviceCapabilities,
    next_id: Cell<u64>,
    live: Arc<AtomicUsize>,
    events: RefCell<Vec<DeviceEvent>>,
    recording: Cell<bool>,
    fail_allocations: Cell<bool>,
}

impl HeadlessDevice {
    /// Creates a device with [`DeviceCapabilities::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::default())
    }

    #[must_use]
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            next_id: Cell::new(1),
            live: Arc::new(AtomicUsize::new(0)),
            events: RefCell::new(Vec::new()),
            recording: Cell::new(true),
            fail_allocations: Cell::new(false),
        }
    }

    /// Makes every following `create_texture` call fail until reset.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    /// Turns the event log on or off. Switching it off also clears it.
    pub fn set_recording(&self, recording: bool) {
        self.recording.set(recording);
        if !recording {
            self.clear_events();
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    /// Textures created and not yet dropped.
    #[must_use]
    pub fn live_texture_count(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Textures created over the device's lifetime.
    #[must_use]
    pub fn created_texture_count(&self) -> usize {
        (self.next_id.get() - 1) as usize
    }

    /// A copy of the event log.
    #[must_use]
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.borrow().clone()
    }

    /// Counts logged events matching `predicate`.
    pub fn count_events(&self, predicate: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: DeviceEvent) {
        if self.recording.get() {
            self.events.borrow_mut().push(event);
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureDevice for HeadlessDevice {
    type Texture = HeadlessTexture;

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_texture(&self, info: &TextureCreateInfo<'_>) -> Result<HeadlessTexture> {
        if self.fail_allocations.get() {
            return Err(PoolError::TextureCreationFailed {
                label: info.label.to_string(),
                reason: "headless device is failing allocations".to_string(),
            });
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let size_bytes = info.estimated_size();
        self.live.fetch_add(1, Ordering::Relaxed);
        self.record(DeviceEvent::Created {
            texture: id,
            label: info.label.to_string(),
            size_bytes,
        });

        Ok(HeadlessTexture {
            id,
            shape: info.shape,
            format: info.format,
            sample_count: info.sample_count,
            usage: info.usage,
            size_bytes,
            live: Arc::clone(&self.live),
        })
    }

    fn texture_memory_size(&self, texture: &HeadlessTexture) -> u64 {
        texture.size_bytes
    }

    fn set_debug_name(&self, texture: &HeadlessTexture, name: &str) {
        self.record(DeviceEvent::Renamed {
            texture: texture.id,
            label: name.to_string(),
        });
    }

    fn discard_transient(&self, texture: &HeadlessTexture) {
        self.record(DeviceEvent::Discarded { texture: texture.id });
    }

    fn acquire_transient(&self, texture: &HeadlessTexture) {
        self.record(DeviceEvent::Acquired { texture: texture.id });
    }

    fn transition_writable(&self, texture: &HeadlessTexture) {
        self.record(DeviceEvent::TransitionedWritable { texture: texture.id });
    }
}
