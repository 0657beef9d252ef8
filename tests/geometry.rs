use yolodecode::geometry::{center_to_corner, corner_to_center, iou, iou_many};
use yolodecode::{CenterBox, CornerBox};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Absolute tolerance sized for coordinates up to ~1000 px in f32.
fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3
}

#[test]
fn center_corner_round_trip_is_stable() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let b = CenterBox::new(
            rng.random_range(-50.0f32..600.0),
            rng.random_range(-50.0f32..600.0),
            rng.random_range(0.1f32..400.0),
            rng.random_range(0.1f32..400.0),
        );
        let back = corner_to_center(center_to_corner(b));
        assert!(close(back.cx, b.cx), "{b:?} -> {back:?}");
        assert!(close(back.cy, b.cy), "{b:?} -> {back:?}");
        assert!(close(back.w, b.w), "{b:?} -> {back:?}");
        assert!(close(back.h, b.h), "{b:?} -> {back:?}");

        let c = center_to_corner(b);
        let again = center_to_corner(corner_to_center(c));
        assert!(close(again.x1, c.x1));
        assert!(close(again.y2, c.y2));
    }
}

#[test]
fn iou_of_box_with_itself_is_one() {
    let b = CornerBox::new(10.0, 20.0, 110.0, 70.0);
    assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
}

#[test]
fn iou_of_distant_boxes_is_zero() {
    let b = CornerBox::new(10.0, 20.0, 110.0, 70.0);
    assert_eq!(iou(&b, &b.translated(1000.0, 1000.0)), 0.0);
    assert_eq!(iou(&b, &b.translated(100.0, 0.0)), 0.0);
}

#[test]
fn iou_is_symmetric() {
    let a = CornerBox::new(0.0, 0.0, 10.0, 10.0);
    let b = CornerBox::new(5.0, 5.0, 20.0, 12.0);
    assert!((iou(&a, &b) - iou(&b, &a)).abs() < 1e-7);
    // 5x5 overlap, union 100 + 105 - 25
    assert!((iou(&a, &b) - 25.0 / 180.0).abs() < 1e-6);
}

#[test]
fn iou_with_degenerate_box_is_zero() {
    let a = CornerBox::new(0.0, 0.0, 10.0, 10.0);
    let flat = CornerBox::new(2.0, 2.0, 8.0, 2.0);
    let inverted = CornerBox::new(8.0, 8.0, 2.0, 2.0);
    assert_eq!(iou(&a, &flat), 0.0);
    assert_eq!(iou(&a, &inverted), 0.0);
    assert_eq!(iou(&inverted, &inverted), 0.0);
}

#[test]
fn iou_many_matches_pairwise_iou() {
    let mut rng = StdRng::seed_from_u64(11);
    let reference = CornerBox::new(40.0, 40.0, 120.0, 100.0);
    let others: Vec<CornerBox> = (0..29)
        .map(|_| {
            let x1 = rng.random_range(0.0f32..150.0);
            let y1 = rng.random_range(0.0f32..150.0);
            CornerBox::new(
                x1,
                y1,
                x1 + rng.random_range(-5.0f32..80.0),
                y1 + rng.random_range(-5.0f32..80.0),
            )
        })
        .collect();

    let many = iou_many(&reference, &others);
    assert_eq!(many.len(), others.len());
    for (value, other) in many.iter().zip(&others) {
        assert!((value - iou(&reference, other)).abs() < 1e-6);
    }
    assert!(iou_many(&reference, &[]).is_empty());
}
