//! Axis-aligned rectangle algebra over integer placement coordinates.

/// A placement coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Closed axis-aligned rectangle, normalized on construction.
///
/// Invariant: `xlo <= xhi` and `ylo <= yhi`, so `area() >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    xlo: i64,
    ylo: i64,
    xhi: i64,
    yhi: i64,
}

impl Rect {
    /// Build a rectangle from two corners in any order.
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self {
            xlo: x1.min(x2),
            ylo: y1.min(y2),
            xhi: x1.max(x2),
            yhi: y1.max(y2),
        }
    }

    /// Bounding box of a non-empty point set.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut r = Rect::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            r.xlo = r.xlo.min(p.x);
            r.ylo = r.ylo.min(p.y);
            r.xhi = r.xhi.max(p.x);
            r.yhi = r.yhi.max(p.y);
        }
        Some(r)
    }

    pub fn xlo(&self) -> i64 {
        self.xlo
    }

    pub fn ylo(&self) -> i64 {
        self.ylo
    }

    pub fn xhi(&self) -> i64 {
        self.xhi
    }

    pub fn yhi(&self) -> i64 {
        self.yhi
    }

    pub fn dx(&self) -> i64 {
        self.xhi - self.xlo
    }

    pub fn dy(&self) -> i64 {
        self.yhi - self.ylo
    }

    pub fn area(&self) -> i64 {
        self.dx() * self.dy()
    }

    /// Half-perimeter wirelength.
    pub fn hpwl(&self) -> i64 {
        self.dx() + self.dy()
    }

    /// Closed-boundary intersection test (touching edges count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.xlo <= other.xhi
            && other.xlo <= self.xhi
            && self.ylo <= other.yhi
            && other.ylo <= self.yhi
    }

    /// Strict overlap: the shared region has positive area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.xlo < other.xhi
            && other.xlo < self.xhi
            && self.ylo < other.yhi
            && other.ylo < self.yhi
    }

    /// Clip to the shared region, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            xlo: self.xlo.max(other.xlo),
            ylo: self.ylo.max(other.ylo),
            xhi: self.xhi.min(other.xhi),
            yhi: self.yhi.min(other.yhi),
        })
    }

    /// Bounding union.
    pub fn merge(&self, other: &Rect) -> Rect {
        Rect {
            xlo: self.xlo.min(other.xlo),
            ylo: self.ylo.min(other.ylo),
            xhi: self.xhi.max(other.xhi),
            yhi: self.yhi.max(other.yhi),
        }
    }

    /// Grow by `margin` on every side. Negative margins are clamped so the
    /// rectangle stays normalized.
    pub fn expand(&self, margin: i64) -> Rect {
        let xlo = self.xlo - margin;
        let ylo = self.ylo - margin;
        let xhi = self.xhi + margin;
        let yhi = self.yhi + margin;
        Rect::new(xlo.min(xhi), ylo.min(yhi), xhi.max(xlo), yhi.max(ylo))
    }

    pub fn contains(&self, p: Point) -> bool {
        self.xlo <= p.x && p.x <= self.xhi && self.ylo <= p.y && p.y <= self.yhi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_normalizes_corners() {
        let r = Rect::new(10, 20, 0, 5);
        assert_eq!(r.xlo(), 0);
        assert_eq!(r.ylo(), 5);
        assert_eq!(r.xhi(), 10);
        assert_eq!(r.yhi(), 20);
        assert!(r.area() >= 0);
        assert_eq!(r.area(), r.dx() * r.dy());
    }

    #[test]
    fn intersects_is_symmetric() {
        let cases = [
            (Rect::new(0, 0, 10, 10), Rect::new(5, 5, 15, 15)),
            (Rect::new(0, 0, 10, 10), Rect::new(10, 10, 20, 20)),
            (Rect::new(0, 0, 10, 10), Rect::new(11, 11, 20, 20)),
            (Rect::new(0, 0, 0, 0), Rect::new(0, 0, 5, 5)),
        ];
        for (a, b) in cases {
            assert_eq!(a.intersects(&b), b.intersects(&a));
        }
    }

    #[test]
    fn overlaps_implies_intersects() {
        let cases = [
            (Rect::new(0, 0, 10, 10), Rect::new(5, 5, 15, 15)),
            (Rect::new(0, 0, 10, 10), Rect::new(10, 0, 20, 10)),
            (Rect::new(2, 2, 4, 4), Rect::new(0, 0, 10, 10)),
        ];
        for (a, b) in cases {
            if a.overlaps(&b) {
                assert!(a.intersects(&b));
            }
        }
        // Edge-touching rectangles intersect but do not overlap.
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 20, 10);
        assert!(a.intersects(&b));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn intersect_clips_to_shared_region() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 15, 15);
        let c = a.intersect(&b).unwrap();
        assert_eq!(c, Rect::new(5, 5, 10, 10));
        assert!(a.intersect(&Rect::new(20, 20, 30, 30)).is_none());
    }

    #[test]
    fn merge_is_bounding_union() {
        let a = Rect::new(0, 0, 5, 5);
        let b = Rect::new(10, -2, 12, 3);
        let m = a.merge(&b);
        assert_eq!(m, Rect::new(0, -2, 12, 5));
    }

    #[test]
    fn bounding_of_points() {
        let pts = [Point::new(3, 7), Point::new(-1, 2), Point::new(5, 0)];
        let r = Rect::bounding(&pts).unwrap();
        assert_eq!(r, Rect::new(-1, 0, 5, 7));
        assert!(Rect::bounding(&[]).is_none());
    }

    #[test]
    fn expand_grows_every_side() {
        let r = Rect::new(0, 0, 100, 100).expand(6);
        assert_eq!(r, Rect::new(-6, -6, 106, 106));
        assert_eq!(r.area(), 112 * 112);
    }
}
