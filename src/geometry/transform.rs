use crate::error::{SignError, SignResult};

use super::types::{PageSize, PixelBox, PointRect, RenderedBounds, Rotation};

/// Convert a box's top-left pixel position into its PDF origin
///
/// PDF space has its origin at the bottom-left, so the returned y is the
/// box's *bottom* edge and needs the box height already scaled to points.
pub fn pixel_to_point(
    px: f64,
    py: f64,
    rendered: RenderedBounds,
    page: PageSize,
    height_pt: f64,
) -> (f64, f64) {
    let sx = page.width / rendered.width;
    let sy = page.height / rendered.height;
    (px * sx, page.height - py * sy - height_pt)
}

/// Transform a whole pixel box into a point-space rectangle
pub fn box_to_points(b: PixelBox, rendered: RenderedBounds, page: PageSize) -> PointRect {
    let width = b.width * (page.width / rendered.width);
    let height = b.height * (page.height / rendered.height);
    let (x, y) = pixel_to_point(b.x, b.y, rendered, page, height);
    PointRect {
        x,
        y,
        width,
        height,
    }
}

/// Clamp a box into `[0, max_w] x [0, max_h]`, each axis independently
///
/// Position moves first; size shrinks only when the box is larger than the
/// bounds on that axis.
pub fn clamp_box(b: PixelBox, max_w: f64, max_h: f64) -> PixelBox {
    let (x, width) = clamp_axis(b.x, b.width, max_w);
    let (y, height) = clamp_axis(b.y, b.height, max_h);
    PixelBox {
        x,
        y,
        width,
        height,
    }
}

fn clamp_axis(pos: f64, len: f64, max: f64) -> (f64, f64) {
    let max = max.max(0.0);
    let len = len.min(max);
    let pos = pos.min(max - len).max(0.0);
    (pos, len)
}

/// Reduce an angle modulo 360, accepting only quarter turns
pub fn normalize_rotation(angle_degrees: i64) -> SignResult<Rotation> {
    match angle_degrees.rem_euclid(360) {
        0 => Ok(Rotation::Deg0),
        90 => Ok(Rotation::Deg90),
        180 => Ok(Rotation::Deg180),
        270 => Ok(Rotation::Deg270),
        _ => Err(SignError::UnsupportedRotation(angle_degrees)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn letter() -> PageSize {
        PageSize::new(612.0, 792.0)
    }

    #[test]
    fn test_letter_page_scenario() {
        let rendered = RenderedBounds::new(800.0, 1000.0);
        let rect = box_to_points(PixelBox::new(40.0, 50.0, 160.0, 60.0), rendered, letter());

        assert!((rect.x - 30.6).abs() < EPS);
        assert!((rect.width - 122.4).abs() < EPS);
        assert!((rect.height - 47.52).abs() < EPS);
        assert!((rect.y - 704.88).abs() < EPS);
    }

    #[test]
    fn test_top_edge_matches_flipped_pixel_top() {
        let rendered = RenderedBounds::new(918.0, 1188.0);
        let page = letter();
        for &(x, y, w, h) in &[
            (0.0, 0.0, 10.0, 10.0),
            (100.0, 250.0, 150.0, 75.0),
            (700.0, 1100.0, 200.0, 88.0),
        ] {
            let rect = box_to_points(PixelBox::new(x, y, w, h), rendered, page);
            assert!((rect.x - x * (612.0 / 918.0)).abs() < EPS);
            assert!((rect.top() - (792.0 - y * (792.0 / 1188.0))).abs() < EPS);
        }
    }

    #[test]
    fn test_pixel_to_point_uses_bottom_edge() {
        let rendered = RenderedBounds::new(612.0, 792.0);
        let (x, y) = pixel_to_point(0.0, 0.0, rendered, letter(), 100.0);
        assert_eq!(x, 0.0);
        assert_eq!(y, 692.0);
    }

    #[test]
    fn test_clamp_only_adjusts_out_of_range_axis() {
        let clamped = clamp_box(PixelBox::new(-10.0, 5.0, 50.0, 50.0), 100.0, 100.0);
        assert_eq!(clamped, PixelBox::new(0.0, 5.0, 50.0, 50.0));
    }

    #[test]
    fn test_clamp_pulls_back_from_far_edge() {
        let clamped = clamp_box(PixelBox::new(80.0, 90.0, 50.0, 20.0), 100.0, 100.0);
        assert_eq!(clamped, PixelBox::new(50.0, 80.0, 50.0, 20.0));
    }

    #[test]
    fn test_clamp_shrinks_oversized_box() {
        let clamped = clamp_box(PixelBox::new(-5.0, 10.0, 150.0, 30.0), 100.0, 100.0);
        assert_eq!(clamped, PixelBox::new(0.0, 10.0, 100.0, 30.0));
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let boxes = [
            PixelBox::new(-10.0, 5.0, 50.0, 50.0),
            PixelBox::new(90.0, 95.0, 30.0, 30.0),
            PixelBox::new(-50.0, -50.0, 500.0, 20.0),
            PixelBox::new(12.5, 33.3, 40.1, 7.7),
        ];
        for b in boxes {
            let once = clamp_box(b, 100.0, 120.0);
            assert_eq!(clamp_box(once, 100.0, 120.0), once);
        }
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0).unwrap(), Rotation::Deg0);
        assert_eq!(normalize_rotation(450).unwrap(), Rotation::Deg90);
        assert_eq!(normalize_rotation(-90).unwrap(), Rotation::Deg270);
        assert_eq!(normalize_rotation(540).unwrap(), Rotation::Deg180);
        assert!(matches!(
            normalize_rotation(45),
            Err(SignError::UnsupportedRotation(45))
        ));
    }
}
