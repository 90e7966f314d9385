//! Geometric kernel for the extraction pipeline.
//!
//! Pure, side-effect-free functions over [`BoundingBox`]. Inputs must
//! satisfy the bounding box invariants; nothing here mutates its arguments.

use crate::error::Result;
use crate::models::BoundingBox;

/// Intersection over Union of two boxes.
///
/// Returns 0.0 when the boxes are on different pages, do not intersect, or
/// the union is empty.
///
/// # Examples
///
/// ```
/// use docscalpel::models::BoundingBox;
/// use docscalpel::geometry::iou;
///
/// let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0, 1, 0.0).unwrap();
/// let b = BoundingBox::new(50.0, 50.0, 100.0, 100.0, 1, 0.0).unwrap();
/// assert!(iou(&a, &b) > 0.0);
/// assert_eq!(iou(&a, &a), 1.0);
/// ```
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.page_number != b.page_number {
        return 0.0;
    }

    let x_left = a.x.max(b.x);
    let y_top = a.y.max(b.y);
    let x_right = a.x2().min(b.x2());
    let y_bottom = a.y2().min(b.y2());

    if x_right < x_left || y_bottom < y_top {
        return 0.0;
    }

    let intersection = (x_right - x_left) * (y_bottom - y_top);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Minimum axis-aligned distance between two boxes.
///
/// Returns 0.0 when the boxes overlap on both axes. When only one axis has
/// a gap, returns that gap. When both axes have a gap, returns the smaller
/// of the two gaps rather than the Euclidean corner distance; this favors
/// axis-aligned proximity, which is what multi-panel figure fragments
/// exhibit. Boxes on different pages are infinitely far apart.
pub fn min_distance(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.page_number != b.page_number {
        return f32::INFINITY;
    }

    let h_gap = if a.x2() < b.x {
        b.x - a.x2()
    } else if b.x2() < a.x {
        a.x - b.x2()
    } else {
        0.0
    };

    let v_gap = if a.y2() < b.y {
        b.y - a.y2()
    } else if b.y2() < a.y {
        a.y - b.y2()
    } else {
        0.0
    };

    if h_gap == 0.0 && v_gap == 0.0 {
        0.0
    } else if h_gap == 0.0 {
        v_gap
    } else if v_gap == 0.0 {
        h_gap
    } else {
        h_gap.min(v_gap)
    }
}

/// Signed vertical gap between two boxes.
///
/// Returns 0.0 when the boxes overlap vertically. Otherwise the gap between
/// the closer horizontal edges: positive when `a` is entirely above `b`,
/// negative when `a` is entirely below `b`.
pub fn vertical_gap(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.y2() <= b.y {
        b.y - a.y2()
    } else if b.y2() <= a.y {
        -(a.y - b.y2())
    } else {
        0.0
    }
}

/// True iff `a` lies entirely above `b` (so `b` is below `a`).
pub fn is_below(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.y2() <= b.y
}

/// Minimum enclosing rectangle of a non-empty set of boxes.
///
/// The result takes its page number and padding from the first box; callers
/// are expected to pass same-page boxes.
pub fn enclosing(boxes: &[&BoundingBox]) -> Result<BoundingBox> {
    debug_assert!(!boxes.is_empty());

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for b in boxes {
        min_x = min_x.min(b.x);
        min_y = min_y.min(b.y);
        max_x = max_x.max(b.x2());
        max_y = max_y.max(b.y2());
    }

    BoundingBox::new(
        min_x,
        min_y,
        max_x - min_x,
        max_y - min_y,
        boxes[0].page_number,
        boxes[0].padding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::new(x, y, w, h, 1, 0.0).unwrap()
    }

    fn bbox_on(page: u32, x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::new(x, y, w, h, page, 0.0).unwrap()
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = bbox(10.0, 10.0, 100.0, 50.0);
        assert_eq!(iou(&a, &a), 1.0);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(100.0, 100.0, 50.0, 50.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // 50x50 overlap of two 100x100 boxes: 2500 / (10000 + 10000 - 2500)
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 50.0, 100.0, 100.0);
        let expected = 2500.0 / 17500.0;
        assert!((iou(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_iou_different_pages() {
        let a = bbox_on(1, 0.0, 0.0, 100.0, 100.0);
        let b = bbox_on(2, 0.0, 0.0, 100.0, 100.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_min_distance_overlapping() {
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 50.0, 100.0, 100.0);
        assert_eq!(min_distance(&a, &b), 0.0);
        assert_eq!(min_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_min_distance_vertical_gap_only() {
        let a = bbox(0.0, 0.0, 100.0, 50.0);
        let b = bbox(20.0, 70.0, 100.0, 50.0);
        assert_eq!(min_distance(&a, &b), 20.0);
    }

    #[test]
    fn test_min_distance_takes_smaller_axis_gap() {
        // 10pt horizontal gap, 30pt vertical gap: axis minimum, not Euclidean
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(60.0, 80.0, 50.0, 50.0);
        assert_eq!(min_distance(&a, &b), 10.0);
    }

    #[test]
    fn test_vertical_gap_signs() {
        let top = bbox(0.0, 0.0, 50.0, 50.0);
        let bottom = bbox(0.0, 60.0, 50.0, 50.0);
        assert_eq!(vertical_gap(&top, &bottom), 10.0);
        assert_eq!(vertical_gap(&bottom, &top), -10.0);

        let overlapping = bbox(0.0, 40.0, 50.0, 50.0);
        assert_eq!(vertical_gap(&top, &overlapping), 0.0);
    }

    #[test]
    fn test_is_below() {
        let fig = bbox(0.0, 0.0, 100.0, 100.0);
        let caption = bbox(0.0, 110.0, 100.0, 20.0);
        assert!(is_below(&fig, &caption));
        assert!(!is_below(&caption, &fig));
        // Touching edges count as below
        let touching = bbox(0.0, 100.0, 100.0, 20.0);
        assert!(is_below(&fig, &touching));
    }

    #[test]
    fn test_enclosing_contains_all_inputs() {
        let a = bbox(10.0, 10.0, 50.0, 50.0);
        let b = bbox(100.0, 5.0, 30.0, 80.0);
        let merged = enclosing(&[&a, &b]).unwrap();
        assert_eq!(merged.x, 10.0);
        assert_eq!(merged.y, 5.0);
        assert_eq!(merged.x2(), 130.0);
        assert_eq!(merged.y2(), 85.0);
        for input in [&a, &b] {
            assert!(merged.x <= input.x && merged.y <= input.y);
            assert!(merged.x2() >= input.x2() && merged.y2() >= input.y2());
        }
    }

    proptest! {
        #[test]
        fn prop_iou_symmetric(
            ax in 0.0f32..500.0, ay in 0.0f32..500.0,
            aw in 1.0f32..200.0, ah in 1.0f32..200.0,
            bx in 0.0f32..500.0, by in 0.0f32..500.0,
            bw in 1.0f32..200.0, bh in 1.0f32..200.0,
        ) {
            let a = bbox(ax, ay, aw, ah);
            let b = bbox(bx, by, bw, bh);
            prop_assert!((iou(&a, &b) - iou(&b, &a)).abs() < 1e-6);
        }

        #[test]
        fn prop_iou_in_unit_range(
            ax in 0.0f32..500.0, ay in 0.0f32..500.0,
            aw in 1.0f32..200.0, ah in 1.0f32..200.0,
            bx in 0.0f32..500.0, by in 0.0f32..500.0,
            bw in 1.0f32..200.0, bh in 1.0f32..200.0,
        ) {
            let a = bbox(ax, ay, aw, ah);
            let b = bbox(bx, by, bw, bh);
            let v = iou(&a, &b);
            prop_assert!((0.0..=1.0 + 1e-6).contains(&v));
        }

        #[test]
        fn prop_min_distance_self_is_zero(
            x in 0.0f32..500.0, y in 0.0f32..500.0,
            w in 1.0f32..200.0, h in 1.0f32..200.0,
        ) {
            let a = bbox(x, y, w, h);
            prop_assert_eq!(min_distance(&a, &a), 0.0);
        }

        #[test]
        fn prop_min_distance_symmetric(
            ax in 0.0f32..500.0, ay in 0.0f32..500.0,
            aw in 1.0f32..200.0, ah in 1.0f32..200.0,
            bx in 0.0f32..500.0, by in 0.0f32..500.0,
            bw in 1.0f32..200.0, bh in 1.0f32..200.0,
        ) {
            let a = bbox(ax, ay, aw, ah);
            let b = bbox(bx, by, bw, bh);
            prop_assert!((min_distance(&a, &b) - min_distance(&b, &a)).abs() < 1e-4);
        }
    }
}
