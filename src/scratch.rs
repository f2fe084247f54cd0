// Scratch engine: turns pointer movement into erase strokes on the mask.
// Every pixel within the brush radius of a stroke segment becomes revealed.
// Erasing never re-covers, so repeated strokes over the same path change nothing.

use crate::types::ScratchMask;

/// A pointer position in surface pixel coordinates.
pub type Point = (f32, f32);

/// Remembers the last pointer position so consecutive moves join into segments.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Stroke {
    last: Option<Point>,
}

impl Stroke {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment from the previous position to `to`. The first move of a stroke
    /// is a dot (both endpoints equal).
    pub fn advance(&mut self, to: Point) -> (Point, Point) {
        let from = self.last.unwrap_or(to);
        self.last = Some(to);
        (from, to)
    }

    /// Forget the previous position; the next move starts a new dot.
    pub fn end(&mut self) {
        self.last = None;
    }
}

/// Clamp a pointer coordinate onto the mask. Non-finite input yields None.
fn clamp_point(mask: &ScratchMask, (x, y): Point) -> Option<Point> {
    if !x.is_finite() || !y.is_finite() || mask.width() == 0 || mask.height() == 0 {
        return None;
    }
    let max_x = (mask.width() - 1) as f32;
    let max_y = (mask.height() - 1) as f32;
    Some((x.clamp(0.0, max_x), y.clamp(0.0, max_y)))
}

/// Squared distance from `p` to the segment `a`-`b`.
#[inline]
fn dist2_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (apx, apy) = (p.0 - a.0, p.1 - a.1);
    let len2 = abx * abx + aby * aby;
    // Degenerate segment: distance to the dot.
    let t = if len2 > 0.0 { ((apx * abx + apy * aby) / len2).clamp(0.0, 1.0) } else { 0.0 };
    let dx = apx - t * abx;
    let dy = apy - t * aby;
    dx * dx + dy * dy
}

/// Reveal every pixel within `radius` of the segment `from`-`to`.
/// Out-of-bounds endpoints are clamped onto the mask. Returns how many pixels
/// went from covered to revealed.
pub fn erase(mask: &mut ScratchMask, from: Point, to: Point, radius: f32) -> usize {
    let (Some(a), Some(b)) = (clamp_point(mask, from), clamp_point(mask, to)) else {
        return 0;
    };
    if !(radius > 0.0) || mask.covered_count() == 0 {
        return 0;
    }
    let r2 = radius * radius;

    // Scan only the segment's bounding box grown by the radius.
    let x_lo = (a.0.min(b.0) - radius).floor().max(0.0) as usize;
    let y_lo = (a.1.min(b.1) - radius).floor().max(0.0) as usize;
    let x_hi = ((a.0.max(b.0) + radius).ceil() as usize).min(mask.width() - 1);
    let y_hi = ((a.1.max(b.1) + radius).ceil() as usize).min(mask.height() - 1);

    let mut revealed = 0;
    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            if !mask.is_covered(x, y) {
                continue;
            }
            if dist2_to_segment((x as f32, y as f32), a, b) <= r2 && mask.reveal(x, y) {
                revealed += 1;
            }
        }
    }
    revealed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(w: usize, h: usize) -> ScratchMask {
        ScratchMask::from_coverage(w, h, vec![true; w * h])
    }

    #[test]
    fn first_move_is_a_dot() {
        let mut stroke = Stroke::new();
        assert_eq!(stroke.advance((3.0, 4.0)), ((3.0, 4.0), (3.0, 4.0)));
        assert_eq!(stroke.advance((5.0, 4.0)), ((3.0, 4.0), (5.0, 4.0)));
        stroke.end();
        assert_eq!(stroke.advance((0.0, 0.0)), ((0.0, 0.0), (0.0, 0.0)));
        // Zero is a real previous position, not "unset".
        assert_eq!(stroke.advance((1.0, 1.0)), ((0.0, 0.0), (1.0, 1.0)));
    }

    #[test]
    fn dot_reveals_a_disc() {
        let mut mask = full(11, 11);
        let n = erase(&mut mask, (5.0, 5.0), (5.0, 5.0), 1.0);
        // Center plus its four neighbours.
        assert_eq!(n, 5);
        assert!(!mask.is_covered(5, 5));
        assert!(!mask.is_covered(4, 5));
        assert!(mask.is_covered(4, 4));
        assert_eq!(mask.covered_count(), 121 - 5);
    }

    #[test]
    fn segment_reveals_a_capsule() {
        let mut mask = full(20, 5);
        erase(&mut mask, (2.0, 2.0), (17.0, 2.0), 1.0);
        for x in 2..=17 {
            assert!(!mask.is_covered(x, 1));
            assert!(!mask.is_covered(x, 2));
            assert!(!mask.is_covered(x, 3));
        }
        assert!(mask.is_covered(0, 2));
        assert!(mask.is_covered(19, 2));
        assert!(mask.is_covered(5, 0));
        assert_eq!(mask.covered_count(), mask.recount());
    }

    #[test]
    fn covered_count_never_increases() {
        let mut mask = full(30, 30);
        let strokes = [
            ((0.0, 0.0), (29.0, 29.0)),
            ((29.0, 0.0), (0.0, 29.0)),
            ((15.0, 15.0), (15.0, 15.0)),
            ((-50.0, 10.0), (80.0, 10.0)),
        ];
        let mut prev = mask.covered_count();
        for (a, b) in strokes {
            erase(&mut mask, a, b, 2.5);
            assert!(mask.covered_count() <= prev);
            prev = mask.covered_count();
        }
    }

    #[test]
    fn erasing_twice_equals_erasing_once() {
        let mut once = full(25, 25);
        erase(&mut once, (3.0, 4.0), (20.0, 17.0), 3.0);
        let mut twice = once.clone();
        assert_eq!(erase(&mut twice, (3.0, 4.0), (20.0, 17.0), 3.0), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn out_of_bounds_points_are_clamped() {
        let mut mask = full(10, 10);
        let n = erase(&mut mask, (-100.0, -100.0), (-100.0, -100.0), 1.0);
        // Clamped to the corner: (0,0), (1,0), (0,1).
        assert_eq!(n, 3);
        assert!(!mask.is_covered(0, 0));
        assert_eq!(erase(&mut mask, (f32::NAN, 1.0), (2.0, 2.0), 1.0), 0);
    }

    #[test]
    fn outside_silhouette_stays_revealed() {
        let mut cov = vec![true; 9];
        cov[0] = false;
        let mut mask = ScratchMask::from_coverage(3, 3, cov);
        erase(&mut mask, (0.0, 0.0), (2.0, 2.0), 5.0);
        assert_eq!(mask.covered_count(), 0);
        assert!(!mask.is_covered(0, 0));
    }
}
