use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use myth_rtpool::{
    HeadlessDevice, PooledRenderTarget, RenderTargetDesc, RenderTargetPool, RenderTargetPoolSettings,
    SnapshotArena, TargetableFlags, TextureFlags,
};

type Slot = Option<PooledRenderTarget<HeadlessDevice>>;

/// A post-process chain worth of targets: full, half and quarter resolution
/// in a few formats.
fn frame_descs() -> Vec<RenderTargetDesc> {
    let rt = TargetableFlags::RENDER_TARGETABLE | TargetableFlags::SHADER_RESOURCE;
    let mut descs = Vec::new();
    for shift in 0..3 {
        let (w, h) = (1920 >> shift, 1080 >> shift);
        descs.push(RenderTargetDesc::new_2d(w, h, wgpu::TextureFormat::Rgba16Float, rt));
        descs.push(RenderTargetDesc::new_2d(w, h, wgpu::TextureFormat::Rgba8Unorm, rt));
        descs.push(
            RenderTargetDesc::new_2d(w, h, wgpu::TextureFormat::Rg16Float, rt).with_flags(TextureFlags::FAST_VRAM),
        );
    }
    descs.push(RenderTargetDesc::new_2d(
        1920,
        1080,
        wgpu::TextureFormat::Depth32Float,
        TargetableFlags::DEPTH_STENCIL_TARGETABLE,
    ));
    descs
}

fn warm_pool(descs: &[RenderTargetDesc]) -> RenderTargetPool<HeadlessDevice> {
    let device = HeadlessDevice::new();
    device.set_recording(false);
    let mut pool = RenderTargetPool::new(device, RenderTargetPoolSettings::default());
    let mut slots: Vec<Slot> = descs.iter().map(|_| None).collect();
    for (slot, desc) in slots.iter_mut().zip(descs) {
        pool.find_free_element(desc, slot, "Warmup").unwrap();
    }
    pool
}

// ---------------------------------------------------------------------------
// Steady-state frames
// ---------------------------------------------------------------------------

fn bench_reuse_frame(c: &mut Criterion) {
    let descs = frame_descs();
    let mut pool = warm_pool(&descs);

    c.bench_function("rt_pool_frame_10_targets_reused", |b| {
        b.iter(|| {
            pool.tick_pool_elements();
            let mut slots: Vec<Slot> = descs.iter().map(|_| None).collect();
            for (slot, desc) in slots.iter_mut().zip(&descs) {
                pool.find_free_element(desc, slot, "Frame").unwrap();
            }
            black_box(&slots);
        });
    });
}

fn bench_preserved_slots(c: &mut Criterion) {
    let descs = frame_descs();
    let mut pool = warm_pool(&descs);
    let mut slots: Vec<Slot> = descs.iter().map(|_| None).collect();

    c.bench_function("rt_pool_frame_10_targets_preserved", |b| {
        b.iter(|| {
            pool.tick_pool_elements();
            for (slot, desc) in slots.iter_mut().zip(&descs) {
                black_box(pool.find_free_element(desc, slot, "Persistent").unwrap());
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Lookup in a crowded pool
// ---------------------------------------------------------------------------

fn bench_crowded_lookup(c: &mut Criterion) {
    let descs: Vec<RenderTargetDesc> = (1..=256)
        .map(|i| {
            RenderTargetDesc::new_2d(
                i * 4,
                i * 4,
                wgpu::TextureFormat::Rgba8Unorm,
                TargetableFlags::RENDER_TARGETABLE,
            )
        })
        .collect();
    let mut pool = warm_pool(&descs);
    let last = descs[descs.len() - 1].clone();

    c.bench_function("rt_pool_lookup_last_of_256", |b| {
        b.iter(|| {
            let mut slot: Slot = None;
            pool.find_free_element(black_box(&last), &mut slot, "Lookup").unwrap();
            black_box(slot);
        });
    });
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

fn bench_snapshots(c: &mut Criterion) {
    let descs = frame_descs();
    let mut pool = warm_pool(&descs);
    let mut slots: Vec<Slot> = descs.iter().map(|_| None).collect();
    for (slot, desc) in slots.iter_mut().zip(&descs) {
        pool.find_free_element(desc, slot, "Snapshot").unwrap();
    }
    let mut arena = SnapshotArena::with_capacity(16 * 1024);

    c.bench_function("rt_pool_snapshot_10_targets", |b| {
        b.iter(|| {
            for handle in slots.iter().flatten() {
                black_box(arena.snapshot(handle));
            }
            arena.reset();
        });
    });
}

criterion_group!(
    benches,
    bench_reuse_frame,
    bench_preserved_slots,
    bench_crowded_lookup,
    bench_snapshots
);
criterion_main!(benches);
