use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_gb::GameBoy;

/// A blank 32KB cartridge image: no mapper header bytes set, so it loads as
/// `Mapper::None` and just executes whatever garbage is in the zeroed ROM.
/// Good enough to measure raw step throughput without needing a real game.
fn blank_cart() -> Vec<u8> {
    vec![0u8; 0x8000]
}

fn bench_single_step(c: &mut Criterion) {
    c.bench_function("gameboy_step_single", |b| {
        let mut gb = GameBoy::new();
        gb.load_rom(&blank_cart());
        b.iter(|| {
            black_box(gb.step());
        });
    });
}

fn bench_step_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("gameboy_step_frame");

    for frame_count in [1, 10, 60].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(frame_count),
            frame_count,
            |b, &count| {
                let mut gb = GameBoy::new();
                gb.load_rom(&blank_cart());
                b.iter(|| {
                    for _ in 0..count {
                        black_box(gb.step_frame());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_save_state_round_trip(c: &mut Criterion) {
    c.bench_function("gameboy_save_state_round_trip", |b| {
        let mut gb = GameBoy::new();
        gb.load_rom(&blank_cart());
        gb.step_frame();
        b.iter(|| {
            let state = gb.serialize();
            black_box(&state);
        });
    });
}

criterion_group!(
    benches,
    bench_single_step,
    bench_step_frame,
    bench_save_state_round_trip
);
criterion_main!(benches);
