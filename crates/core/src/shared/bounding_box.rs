/// Axis-aligned face box in pixel coordinates.
///
/// `x`/`y` may be negative for detections that extend past the frame edge;
/// use [`BoundingBox::clamped`] before indexing pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection with a `frame_width x frame_height` frame, or `None`
    /// if the box lies entirely outside it.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(frame_width as i32);
        let y2 = self.bottom().min(frame_height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_area() {
        let b = BoundingBox::new(10, 20, 30, 40);
        assert_eq!(b.right(), 40);
        assert_eq!(b.bottom(), 60);
        assert_eq!(b.area(), 1200);
    }

    #[test]
    fn test_negative_size_has_zero_area() {
        assert_eq!(BoundingBox::new(0, 0, -5, 10).area(), 0);
    }

    #[test]
    fn test_clamped_inside_is_unchanged() {
        let b = BoundingBox::new(10, 10, 20, 20);
        assert_eq!(b.clamped(100, 100), Some(b));
    }

    #[test]
    fn test_clamped_crosses_edges() {
        let b = BoundingBox::new(-10, 90, 30, 30);
        assert_eq!(b.clamped(100, 100), Some(BoundingBox::new(0, 90, 20, 10)));
    }

    #[test]
    fn test_clamped_outside_is_none() {
        assert_eq!(BoundingBox::new(150, 0, 10, 10).clamped(100, 100), None);
        assert_eq!(BoundingBox::new(10, 10, 0, 10).clamped(100, 100), None);
    }

    #[test]
    fn test_edges_saturate_for_huge_boxes() {
        let b = BoundingBox::new(i32::MAX - 5, i32::MAX - 5, i32::MAX, i32::MAX);
        assert_eq!(b.right(), i32::MAX);
        assert_eq!(b.bottom(), i32::MAX);
        let spill = BoundingBox::new(90, 90, i32::MAX, i32::MAX);
        assert_eq!(spill.clamped(100, 100), Some(BoundingBox::new(90, 90, 10, 10)));
    }
}
