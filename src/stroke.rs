use crate::math::{lerp, Vec2f};

/// One quadratic Bézier piece of a stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadSegment {
    pub from: Vec2f,
    pub ctrl: Vec2f,
    pub to: Vec2f,
}

/// Accumulated geometry of the in-progress stroke.
pub struct StrokePath {
    start: Vec2f,
    segments: Vec<QuadSegment>,
}

impl StrokePath {
    fn new(start: Vec2f) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    /// The point the next segment continues from: the endpoint of the last
    /// segment, or the path start while the path is still empty.
    fn current(&self) -> Vec2f {
        self.segments.last().map(|seg| seg.to).unwrap_or(self.start)
    }

    fn quad_to(&mut self, ctrl: Vec2f, to: Vec2f) -> QuadSegment {
        let seg = QuadSegment {
            from: self.current(),
            ctrl,
            to,
        };
        self.segments.push(seg);
        seg
    }

    pub fn segments(&self) -> &[QuadSegment] {
        &self.segments
    }
}

/// Turns raw pointer samples into smoothed quadratic segments.
///
/// Moves are filtered against `tolerance`: a sample that stays within the
/// tolerance of the last accepted one (on both axes) is dropped. Accepted
/// samples extend the path with a curve through the midpoint, using the last
/// accepted sample as the control point, which rounds off the polyline the
/// raw samples would otherwise form.
pub struct StrokeTracker {
    /// Minimum per-axis displacement, in pixels, for a move to be accepted.
    tolerance: f32,
    stroke: Option<ActiveStroke>,
}

struct ActiveStroke {
    path: StrokePath,
    /// Last raw accepted sample. Reference point for the tolerance test and
    /// control point of the next segment.
    anchor: Vec2f,
}

impl StrokeTracker {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            stroke: None,
        }
    }

    /// Begins a stroke at `position`.
    ///
    /// If a stroke is already in progress its path is dropped as-is; segments
    /// it already produced stay committed, the rest of the gesture starts
    /// over from `position`.
    pub fn on_start(&mut self, position: Vec2f) {
        self.stroke = Some(ActiveStroke {
            path: StrokePath::new(position),
            anchor: position,
        });
    }

    /// Feeds a pointer move, returning the segment to commit if the move was
    /// accepted. Moves within the tolerance (and moves outside a gesture)
    /// return `None` and leave all state untouched.
    pub fn on_move(&mut self, position: Vec2f) -> Option<QuadSegment> {
        let stroke = self.stroke.as_mut()?;

        let delta = position - stroke.anchor;
        if delta.x().abs() < self.tolerance && delta.y().abs() < self.tolerance {
            return None;
        }

        // Curve towards the midpoint so the next segment can smoothly pick
        // up from there, with the raw sample acting as the control point.
        let mid = lerp(stroke.anchor..=position, 0.5);
        let seg = stroke.path.quad_to(stroke.anchor, mid);
        stroke.anchor = position;
        Some(seg)
    }

    /// Ends the stroke, returning the finished path. Returns `None` if no
    /// stroke was in progress.
    pub fn on_end(&mut self) -> Option<StrokePath> {
        self.stroke.take().map(|stroke| stroke.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2;

    fn tracker() -> StrokeTracker {
        StrokeTracker::new(5.0)
    }

    #[test]
    fn ignores_moves_within_tolerance() {
        let mut t = tracker();
        t.on_start(vec2(10.0, 10.0));
        assert_eq!(t.on_move(vec2(12.0, 11.0)), None);
        assert_eq!(t.on_move(vec2(14.9, 14.9)), None);
        assert!(t.on_end().unwrap().segments().is_empty());
    }

    #[test]
    fn commits_curve_through_midpoint() {
        let mut t = tracker();
        t.on_start(vec2(10.0, 10.0));
        assert_eq!(t.on_move(vec2(12.0, 11.0)), None);

        let seg = t.on_move(vec2(20.0, 10.0)).unwrap();
        assert_eq!(
            seg,
            QuadSegment {
                from: vec2(10.0, 10.0),
                ctrl: vec2(10.0, 10.0),
                to: vec2(15.0, 10.0),
            }
        );

        // The anchor is now the raw (20, 10) sample: the next segment starts
        // at the previous midpoint and bends around it.
        let seg = t.on_move(vec2(20.0, 18.0)).unwrap();
        assert_eq!(
            seg,
            QuadSegment {
                from: vec2(15.0, 10.0),
                ctrl: vec2(20.0, 10.0),
                to: vec2(20.0, 14.0),
            }
        );
    }

    #[test]
    fn accepts_single_axis_displacement() {
        let mut t = tracker();
        t.on_start(vec2(0.0, 0.0));
        assert_eq!(t.on_move(vec2(4.9, 4.9)), None);
        assert!(t.on_move(vec2(0.0, 5.0)).is_some());
    }

    #[test]
    fn start_then_end_commits_nothing() {
        let mut t = tracker();
        t.on_start(vec2(3.0, 4.0));
        let path = t.on_end().unwrap();
        assert!(path.segments().is_empty());
        assert!(t.on_end().is_none());
    }

    #[test]
    fn restart_replaces_in_progress_stroke() {
        let mut t = tracker();
        t.on_start(vec2(0.0, 0.0));
        assert!(t.on_move(vec2(10.0, 0.0)).is_some());

        t.on_start(vec2(100.0, 100.0));
        let seg = t.on_move(vec2(110.0, 100.0)).unwrap();
        assert_eq!(
            seg,
            QuadSegment {
                from: vec2(100.0, 100.0),
                ctrl: vec2(100.0, 100.0),
                to: vec2(105.0, 100.0),
            }
        );
        assert_eq!(t.on_end().unwrap().segments().len(), 1);
    }

    #[test]
    fn ignores_moves_outside_a_gesture() {
        let mut t = tracker();
        assert_eq!(t.on_move(vec2(50.0, 50.0)), None);
        assert!(t.on_end().is_none());
    }

    #[test]
    fn path_records_segments_in_order() {
        let mut t = tracker();
        t.on_start(vec2(0.0, 0.0));
        t.on_move(vec2(10.0, 0.0)).unwrap();
        t.on_move(vec2(10.0, 10.0)).unwrap();
        let path = t.on_end().unwrap();
        let segs = path.segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].to, segs[1].from);
        assert_eq!(segs[1].ctrl, vec2(10.0, 0.0));
    }
}
