#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use yolodecode::{ImageDims, PostProcessConfig, PostProcessor, PredictionView};

const NUM_CLASSES: usize = 4;

fn random_buffer(rng: &mut StdRng, shape: [usize; 4]) -> Vec<f32> {
    (0..shape.iter().product::<usize>())
        .map(|_| rng.random_range(-4.0f32..4.0))
        .collect()
}

#[test]
fn parallel_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(99);
    let batch = 4;
    let attrs = 5 + NUM_CLASSES;
    let shapes = [
        [batch, 3 * attrs, 13, 13],
        [batch, 3 * attrs, 26, 26],
        [batch, 3 * attrs, 52, 52],
    ];
    let buffers: Vec<Vec<f32>> = shapes.iter().map(|&s| random_buffer(&mut rng, s)).collect();
    let views: Vec<PredictionView<'_>> = buffers
        .iter()
        .zip(shapes)
        .map(|(data, shape)| PredictionView::new(data, shape).unwrap())
        .collect();
    let dims = [
        ImageDims::new(640.0, 480.0),
        ImageDims::new(416.0, 416.0),
        ImageDims::new(300.0, 900.0),
        ImageDims::new(1920.0, 1080.0),
    ];

    let base = PostProcessConfig {
        num_classes: NUM_CLASSES,
        objectness_threshold: 0.9,
        ..PostProcessConfig::default()
    };
    let seq = PostProcessor::new(PostProcessConfig {
        parallel: false,
        ..base.clone()
    })
    .unwrap();
    let par = PostProcessor::new(PostProcessConfig {
        parallel: true,
        ..base
    })
    .unwrap();

    let seq_candidates = seq.decode(&views).unwrap();
    let par_candidates = par.decode(&views).unwrap();
    assert_eq!(seq_candidates, par_candidates);

    let seq_out = seq.run(&views, &dims).unwrap();
    let par_out = par.run(&views, &dims).unwrap();
    assert!(!seq_out.is_no_detections());
    assert_eq!(seq_out, par_out);
}
