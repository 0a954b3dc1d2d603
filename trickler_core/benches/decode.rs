use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use trickler_core::{Reading, ScaleDecoder, ScaleModel};

// A dispensing trace as each vendor would print it, 0.02 grain steps
fn trace(model: ScaleModel, n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            let cg = i64::try_from(i).unwrap_or(0) * 2;
            let (whole, frac) = (cg / 100, cg % 100);
            match model {
                ScaleModel::And => format!("US,+{whole:05}.{frac:02} GN\r\n"),
                ScaleModel::Creedmoor => format!("+{whole:04}.{frac:02} GN\r\n"),
                ScaleModel::UsSolid => format!("+ {whole:04}.{frac:02}gn\r\n"),
            }
            .into_bytes()
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p trickler_core --bench decode
    if let Ok(n) = std::env::var("BENCH_SAMPLE_SIZE").map(|s| s.parse::<usize>()) {
        group.sample_size(n.unwrap_or(50).max(10));
    }
    for model in ScaleModel::ALL {
        let lines = trace(model, 1_000);
        group.bench_function(model.name(), |b| {
            b.iter_batched(
                || ScaleDecoder::new(model, 5),
                |mut dec| {
                    let mut prev = Reading::default();
                    for line in &lines {
                        if let Ok(r) = dec.decode(black_box(line), &prev) {
                            prev = r;
                        }
                    }
                    prev
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
