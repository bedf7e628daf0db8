use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use host_core::blit::{blit, BlitGeometry};
use host_core::selftest::{compare, fill, run_self_test, SelfTestConfig};
use host_core::sim::{SimDisplay, SimSdram, PANEL_HEIGHT, PANEL_WIDTH, SDRAM_BASE, SDRAM_SIZE};
use host_core::{ExternalMemory, Framebuffer};

/// Framebuffer with a gradient so every pixel differs
fn bench_framebuffer() -> Framebuffer {
    let mut fb = Framebuffer::new();
    for y in 0..240 {
        for x in 0..256 {
            fb.set_pixel(x, y, [x as u8, y as u8, (x ^ y) as u8]);
        }
    }
    fb
}

fn bench_blit_scales(c: &mut Criterion) {
    let mut group = c.benchmark_group("blit_frame");
    let fb = bench_framebuffer();

    for scale in [1u32, 2, 3].iter() {
        // 3x needs a taller panel than the reference board
        let mut display = SimDisplay::new(PANEL_WIDTH, PANEL_HEIGHT.max(240 * scale));
        let geometry = BlitGeometry::new(0, 0, *scale).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(scale), scale, |b, _| {
            b.iter(|| {
                blit(&mut display, black_box(&fb), &geometry);
                black_box(display.pixel(0, 0));
            });
        });
    }

    group.finish();
}

fn bench_self_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("self_test");

    group.bench_function("fill_256", |b| {
        let mut buffer = vec![0u32; 256];
        b.iter(|| {
            fill(&mut buffer, black_box(0xA244_250F));
            black_box(buffer[255]);
        });
    });

    group.bench_function("compare_256", |b| {
        let mut expected = vec![0u32; 256];
        fill(&mut expected, 0xA244_250F);
        let actual = expected.clone();
        b.iter(|| black_box(compare(&expected, &actual)));
    });

    group.bench_function("full_run", |b| {
        let mut sdram = SimSdram::new(SDRAM_BASE, SDRAM_SIZE);
        sdram.init().unwrap();
        let config = SelfTestConfig::default();
        b.iter(|| black_box(run_self_test(&mut sdram, &config).passed()));
    });

    group.finish();
}

criterion_group!(benches, bench_blit_scales, bench_self_test);
criterion_main!(benches);
