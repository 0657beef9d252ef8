#![cfg(feature = "simd")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use yolodecode::lowlevel::{iou_many_scalar, iou_many_simd};
use yolodecode::CornerBox;

fn random_box(rng: &mut StdRng) -> CornerBox {
    let x1 = rng.random_range(0.0f32..400.0);
    let y1 = rng.random_range(0.0f32..400.0);
    CornerBox::new(
        x1,
        y1,
        x1 + rng.random_range(-10.0f32..200.0),
        y1 + rng.random_range(-10.0f32..200.0),
    )
}

#[test]
fn simd_iou_matches_scalar() {
    let mut rng = StdRng::seed_from_u64(5);
    for len in [0usize, 1, 7, 8, 9, 37, 256] {
        let reference = random_box(&mut rng);
        let others: Vec<CornerBox> = (0..len).map(|_| random_box(&mut rng)).collect();
        let scalar = iou_many_scalar(&reference, &others);
        let simd = iou_many_simd(&reference, &others);
        assert_eq!(scalar.len(), simd.len());
        for (a, b) in scalar.iter().zip(&simd) {
            assert!((a - b).abs() <= 1e-6, "len={len}: {a} vs {b}");
        }
    }
}

#[test]
fn simd_iou_handles_degenerate_reference() {
    let reference = CornerBox::new(5.0, 5.0, 5.0, 50.0);
    let others = vec![CornerBox::new(0.0, 0.0, 10.0, 10.0); 12];
    assert!(iou_many_simd(&reference, &others).iter().all(|&v| v == 0.0));
}
