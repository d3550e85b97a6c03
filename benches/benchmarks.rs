// benches/benchmarks.rs -- CPU reference vs the three GPU strategies.
//
// Synthetic images only:
//   cargo bench
//
// The GPU groups are skipped (with a note on stderr) when no Vulkan
// adapter is available, so `cargo bench` still completes in CI.
//
// CRITERION + GPU CAVEATS
// Criterion measures wall time including CPU overhead (buffer writes, bind
// group creation, submit, poll). GPU shader execution is included in the
// poll. That is the right metric here: every strategy blocks on result
// visibility before the pipeline can write the output file. Criterion's
// warmup also absorbs lazy pipeline compilation on drivers that JIT on
// first dispatch.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use monobit::gpu::device::GpuDevice;
use monobit::gpu::threshold::{Strategy, ThresholdKernel};
use monobit::planes::PlanarImage;
use monobit::threshold::binarize_planes;

// ============================================================
// Helpers
// ============================================================

/// Deterministic textured image: gradients plus a few bright rectangles,
/// so the branch in the kernel sees both outcomes.
fn make_scene(w: usize, h: usize) -> PlanarImage {
    let mut img = PlanarImage::new(w, h);
    {
        let (r, g, b) = img.planes_mut();
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                r[i] = ((x * 200 / w) + (y * 55 / h)) as u8;
                g[i] = ((y * 200 / h) + (x * 55 / w)) as u8;
                b[i] = ((x + y) % 256) as u8;
            }
        }
        for rect in 0..4usize {
            let rx = (40 + rect * 110) % w;
            let ry = (30 + rect * 70) % h;
            for y in ry..(ry + 50).min(h) {
                for x in rx..(rx + 60).min(w) {
                    let i = y * w + x;
                    r[i] = 210;
                    g[i] = 200;
                    b[i] = 190;
                }
            }
        }
    }
    img
}

const SIZES: [(usize, usize); 2] = [(512, 512), (1024, 1024)];

// ============================================================
// CPU reference
// ============================================================

fn bench_cpu(c: &mut Criterion) {
    let mut group = c.benchmark_group("binarize_cpu");
    for (w, h) in SIZES {
        let img = make_scene(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &img, |b, img| {
            b.iter(|| {
                let mut work = img.clone();
                binarize_planes(&mut work);
                work
            });
        });
    }
    group.finish();
}

// ============================================================
// GPU strategies
// ============================================================

fn bench_gpu(c: &mut Criterion) {
    let gpu = match GpuDevice::new() {
        Ok(gpu) => gpu,
        Err(e) => {
            eprintln!("[monobit] skipping GPU benchmarks: {e}");
            return;
        }
    };
    let kernel = ThresholdKernel::new(&gpu);

    for (w, h) in SIZES {
        let img = make_scene(w, h);
        let mut group = c.benchmark_group(format!("binarize_gpu_{w}x{h}"));
        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::from_parameter(strategy.name()),
                &img,
                |b, img| {
                    b.iter(|| {
                        let mut work = img.clone();
                        kernel
                            .run(&gpu, &mut work, strategy)
                            .expect("kernel run failed");
                        work
                    });
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_cpu, bench_gpu);
criterion_main!(benches);
