use clawpick_core::{
    ApproachController, ClassProfile, ObjectClass, center_offsets, decide_direction,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

pub fn bench_duration_policy(c: &mut Criterion) {
    let mut g = c.benchmark_group("approach");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p clawpick_core --bench approach
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    }

    let ctl = ApproachController::default();
    let profiles: Vec<ClassProfile> = ObjectClass::ALL.into_iter().map(ClassProfile::builtin).collect();
    let gaps: Vec<f64> = (0..2_000).map(|i| f64::from(i) * 0.05).collect();

    g.bench_function("movement_duration_all_classes", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for p in &profiles {
                for &d in &gaps {
                    total += ctl.movement_duration_ms(black_box(d), p);
                }
            }
            black_box(total)
        });
    });

    g.bench_function("offset_and_direction", |b| {
        b.iter(|| {
            let mut right = 0u32;
            for i in 0..1_920u32 {
                let x = i as f32;
                let (h, _) = center_offsets(black_box([x, 500.0, x + 80.0, 580.0]), 1920, 1080, 0.0);
                if decide_direction(h, 8.0) == clawpick_core::Direction::Right {
                    right += 1;
                }
            }
            black_box(right)
        });
    });
    g.finish();
}

criterion_group!(approach, bench_duration_policy);
criterion_main!(approach);
