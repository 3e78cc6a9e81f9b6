//! Render Target Pool Settings
//!
//! This module defines the runtime configuration of the [`RenderTargetPool`](crate::RenderTargetPool).
//!
//! The settings are a plain value: construct them in code, load them from JSON,
//! or tweak single options by name (console style) with
//! [`RenderTargetPoolSettings::set_option`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_rtpool::{RenderTargetPoolSettings, TransientAliasingMode};
//!
//! // Default: 400 MB budget, fast-VRAM + hinted targets are aliased
//! let settings = RenderTargetPoolSettings::default();
//!
//! // Fixed-memory platform: small budget, alias everything
//! let settings = RenderTargetPoolSettings {
//!     min_pool_size_kb: 96 * 1024,
//!     transient_aliasing_mode: TransientAliasingMode::AllTargets,
//!     ..Default::default()
//! };
//!
//! // From a config file
//! let settings = RenderTargetPoolSettings::from_json(r#"{ "min_pool_size_kb": 0 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{PoolError, Result};

// ---------------------------------------------------------------------------
// TransientAliasingMode
// ---------------------------------------------------------------------------

/// Controls which render targets are turned into transient (aliasable) resources.
///
/// Only takes effect on devices that report transient aliasing support.
///
/// | Mode                | Value | Made transient                                  |
/// |---------------------|-------|-------------------------------------------------|
/// | `Disabled`          | 0     | nothing                                         |
/// | `FastVramOnly`      | 1     | targets carrying the fast-VRAM flag             |
/// | `FastVramAndHinted` | 2     | fast-VRAM targets and requests hinted transient |
/// | `AllTargets`        | 3     | every render / depth-stencil / UAV target       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransientAliasingMode {
    Disabled,
    FastVramOnly,
    #[default]
    FastVramAndHinted,
    AllTargets,
}

impl TryFrom<u8> for TransientAliasingMode {
    type Error = PoolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::FastVramOnly),
            2 => Ok(Self::FastVramAndHinted),
            3 => Ok(Self::AllTargets),
            other => Err(PoolError::InvalidAliasingMode(other)),
        }
    }
}

impl From<TransientAliasingMode> for u8 {
    fn from(mode: TransientAliasingMode) -> Self {
        match mode {
            TransientAliasingMode::Disabled => 0,
            TransientAliasingMode::FastVramOnly => 1,
            TransientAliasingMode::FastVramAndHinted => 2,
            TransientAliasingMode::AllTargets => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderTargetPoolSettings
// ---------------------------------------------------------------------------

/// Configuration for a [`RenderTargetPool`](crate::RenderTargetPool).
///
/// # Fields
///
/// | Field                               | Description                                    | Default            |
/// |-------------------------------------|------------------------------------------------|--------------------|
/// | `min_pool_size_kb`                  | Eviction budget                                | 400 MB             |
/// | `transient_aliasing_mode`           | Which targets become transient                 | `FastVramAndHinted`|
/// | `allow_multiple_discards_per_frame` | Reuse transient memory discarded this frame    | `false`            |
/// | `event_recording_threshold_kb`      | Size gate for allocation event log lines       | `None` (off)       |
/// | `evict_stale_without_pressure`      | Evict stale targets even under budget          | `false`            |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTargetPoolSettings {
    /// Pool size (in KB) the per-frame eviction pass shrinks towards.
    ///
    /// Free targets are only evicted while the pool holds more than this.
    /// `0` evicts every target that has been idle past the grace period.
    pub min_pool_size_kb: u64,

    /// Transient aliasing policy. See [`TransientAliasingMode`].
    pub transient_aliasing_mode: TransientAliasingMode,

    /// Allow a transient target whose physical memory was discarded this frame
    /// to be handed out again within the same frame.
    pub allow_multiple_discards_per_frame: bool,

    /// Allocation, reuse and eviction of targets at least this large (in KB)
    /// are logged at `debug` level. `None` disables the event lines.
    pub event_recording_threshold_kb: Option<u64>,

    /// Evict targets idle for more than
    /// [`STALE_FRAME_COUNT`](crate::pool::STALE_FRAME_COUNT) frames even when
    /// the pool is within budget.
    pub evict_stale_without_pressure: bool,
}

impl Default for RenderTargetPoolSettings {
    fn default() -> Self {
        Self {
            min_pool_size_kb: 400 * 1024,
            transient_aliasing_mode: TransientAliasingMode::default(),
            allow_multiple_discards_per_frame: false,
            event_recording_threshold_kb: None,
            evict_stale_without_pressure: false,
        }
    }
}

impl RenderTargetPoolSettings {
    /// Parses settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sets a single option from its string form.
    ///
    /// Recognized names: `pool.min_size_kb`, `pool.transient_aliasing_mode`,
    /// `pool.allow_multiple_discards`, `pool.event_threshold_kb` (`0` turns it
    /// off) and `pool.evict_stale`. Booleans accept `0`/`1`/`true`/`false`.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || PoolError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();

        match name {
            "pool.min_size_kb" => {
                self.min_pool_size_kb = value.parse().map_err(|_| invalid())?;
            }
            "pool.transient_aliasing_mode" => {
                let raw: u8 = value.parse().map_err(|_| invalid())?;
                self.transient_aliasing_mode = TransientAliasingMode::try_from(raw)?;
            }
            "pool.allow_multiple_discards" => {
                self.allow_multiple_discards_per_frame = parse_bool(value).ok_or_else(invalid)?;
            }
            "pool.event_threshold_kb" => {
                let kb: u64 = value.parse().map_err(|_| invalid())?;
                self.event_recording_threshold_kb = (kb > 0).then_some(kb);
            }
            "pool.evict_stale" => {
                self.evict_stale_without_pressure = parse_bool(value).ok_or_else(invalid)?;
            }
            _ => return Err(PoolError::UnknownOption(name.to_string())),
        }

        log::info!("Render target pool option {name} = {value}");
        Ok(())
    }

    /// Returns `true` when an element of `size_kb` should produce event log lines.
    #[inline]
    #[must_use]
    pub fn records_events_for(&self, size_kb: u64) -> bool {
        self.event_recording_threshold_kb
            .is_some_and(|threshold| size_kb >= threshold)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliasing_mode_round_trips_through_u8() {
        for raw in 0..=3u8 {
            let mode = TransientAliasingMode::try_from(raw).unwrap();
            assert_eq!(u8::from(mode), raw);
        }
        assert!(matches!(
            TransientAliasingMode::try_from(4),
            Err(PoolError::InvalidAliasingMode(4))
        ));
    }

    #[test]
    fn event_threshold_gates_logging() {
        let mut settings = RenderTargetPoolSettings::default();
        assert!(!settings.records_events_for(u64::MAX));

        settings.event_recording_threshold_kb = Some(1024);
        assert!(settings.records_events_for(1024));
        assert!(!settings.records_events_for(1023));
    }
}
