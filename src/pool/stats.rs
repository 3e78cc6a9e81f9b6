//! Pool statistics and memory reports.

use std::fmt;

use rustc_hash::FxHashMap;

/// Headline numbers of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Live tracked elements.
    pub element_count: usize,
    /// Memory held by the pool, in KB.
    pub pool_size_kb: u64,
    /// Memory of elements currently referenced by consumers, in KB.
    pub used_size_kb: u64,
}

/// One line of a [`MemoryReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryReportEntry {
    pub index: usize,
    pub debug_name: String,
    /// Descriptor summary, e.g. `(2D) 512x512 Rgba16Float RT SRV`.
    pub desc: String,
    pub format: wgpu::TextureFormat,
    pub size_kb: u64,
    pub unused_for_frames: u32,
    pub is_free: bool,
    pub is_transient: bool,
}

/// Per-element listing of a pool's memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryReport {
    pub frame_number: u64,
    pub budget_kb: u64,
    pub entries: Vec<MemoryReportEntry>,
}

impl MemoryReport {
    #[must_use]
    pub fn total_kb(&self) -> u64 {
        self.entries.iter().map(|e| e.size_kb).sum()
    }

    #[must_use]
    pub fn used_kb(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| !e.is_free)
            .map(|e| e.size_kb)
            .sum()
    }

    /// Total KB per pixel format.
    #[must_use]
    pub fn size_by_format(&self) -> FxHashMap<wgpu::TextureFormat, u64> {
        let mut sizes = FxHashMap::default();
        for entry in &self.entries {
            *sizes.entry(entry.format).or_insert(0) += entry.size_kb;
        }
        sizes
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Render target pool (frame {}):", self.frame_number)?;
        for entry in &self.entries {
            writeln!(
                f,
                "  [{:3}] {:>8} KB  {:<24} {}  unused:{}{}{}",
                entry.index,
                entry.size_kb,
                entry.debug_name,
                entry.desc,
                entry.unused_for_frames,
                if entry.is_free { "" } else { " (in use)" },
                if entry.is_transient { " (transient)" } else { "" },
            )?;
        }
        write!(
            f,
            "  {} targets, {:.3} MB total, {:.3} MB used, budget {:.3} MB",
            self.entries.len(),
            kb_to_mb(self.total_kb()),
            kb_to_mb(self.used_kb()),
            kb_to_mb(self.budget_kb),
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}
