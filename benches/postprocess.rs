use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use yolodecode::{ImageDims, PostProcessConfig, PostProcessor, PredictionView};

const NUM_CLASSES: usize = 80;
const BATCH: usize = 2;

/// Deterministic logits with a sparse set of confident cells.
fn make_logits(shape: [usize; 4]) -> Vec<f32> {
    let [_, channels, rows, cols] = shape;
    let attrs = 5 + NUM_CLASSES;
    let mut data = Vec::with_capacity(shape.iter().product());
    for b in 0..shape[0] {
        for c in 0..channels {
            for y in 0..rows {
                for x in 0..cols {
                    let hash = (b * 31 + c * 17 + y * 13 + x * 7) % 97;
                    let value = if c % attrs == 4 {
                        if hash < 3 {
                            4.0
                        } else {
                            -6.0
                        }
                    } else {
                        (hash as f32 / 97.0) * 4.0 - 2.0
                    };
                    data.push(value);
                }
            }
        }
    }
    data
}

fn bench_postprocess(c: &mut Criterion) {
    let attrs = 5 + NUM_CLASSES;
    let shapes = [
        [BATCH, 3 * attrs, 13, 13],
        [BATCH, 3 * attrs, 26, 26],
        [BATCH, 3 * attrs, 52, 52],
    ];
    let buffers: Vec<Vec<f32>> = shapes.iter().map(|&s| make_logits(s)).collect();
    let views: Vec<PredictionView<'_>> = buffers
        .iter()
        .zip(shapes)
        .map(|(data, shape)| PredictionView::new(data, shape).unwrap())
        .collect();
    let dims = [ImageDims::new(1280.0, 720.0), ImageDims::new(640.0, 480.0)];

    let processor = PostProcessor::new(PostProcessConfig::default()).unwrap();
    let candidates = processor.decode(&views).unwrap();

    c.bench_function("decode_three_scales", |b| {
        b.iter(|| black_box(processor.decode(&views).unwrap()));
    });

    c.bench_function("filter_candidates", |b| {
        b.iter(|| black_box(processor.filter(&candidates).unwrap()));
    });

    c.bench_function("pipeline", |b| {
        b.iter(|| black_box(processor.run(&views, &dims).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let processor_par = PostProcessor::new(PostProcessConfig {
            parallel: true,
            ..PostProcessConfig::default()
        })
        .unwrap();

        c.bench_function("pipeline_parallel", |b| {
            b.iter(|| black_box(processor_par.run(&views, &dims).unwrap()));
        });
    }
}

criterion_group!(benches, bench_postprocess);
criterion_main!(benches);
