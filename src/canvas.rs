use crate::{
    math::{vec2, Vec2f},
    pen::{Color, Pen},
    raster,
    stroke::QuadSegment,
};

/// A CPU pixel surface: row-major packed `0xAARRGGBB` words.
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl Surface {
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        assert!(
            width > 0 && height > 0,
            "surface dimensions must be positive (got {width}x{height})"
        );
        Self {
            width,
            height,
            data: vec![fill.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color(self.data[self.index(x, y)])
    }

    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        let i = self.index(x, y);
        self.data[i] = color.0;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }
}

/// The decorative frame: a rectangle inset from the viewport edges by a
/// fixed margin. Drawn fresh over every repaint, never persisted into the
/// offscreen surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub min: Vec2f,
    pub max: Vec2f,
}

impl Frame {
    fn inset(width: u32, height: u32, inset: u32) -> Self {
        let inset = inset as f32;
        Self {
            min: vec2(inset, inset),
            max: vec2(width as f32 - inset, height as f32 - inset),
        }
    }
}

enum ViewState {
    Unsized,
    Sized { surface: Surface, frame: Frame },
}

/// Owns the persistent offscreen surface and the frame geometry, and
/// produces the final visible image.
///
/// The offscreen surface accumulates every committed segment and is never
/// cleared, except by `resize` replacing it with a fresh background-filled
/// one.
pub struct Compositor {
    background: Color,
    frame_inset: u32,
    pen: Pen,
    state: ViewState,
}

impl Compositor {
    pub fn new(background: Color, frame_inset: u32, pen: Pen) -> Self {
        Self {
            background,
            frame_inset,
            pen,
            state: ViewState::Unsized,
        }
    }

    /// Allocates a fresh background-filled offscreen surface for the new
    /// viewport size and recomputes the frame. Replacing the state drops any
    /// previous surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        log::debug!("allocating {width}x{height} canvas surface");
        self.state = ViewState::Sized {
            surface: Surface::new(width, height, self.background),
            frame: Frame::inset(width, height, self.frame_inset),
        };
    }

    /// Draws one stroke segment onto the offscreen surface. Ignored until
    /// the first `resize` has provided a surface to draw on.
    pub fn commit_segment(&mut self, seg: &QuadSegment, pen: &Pen) {
        if let ViewState::Sized { surface, .. } = &mut self.state {
            raster::stroke_quad(surface, seg, pen);
        }
    }

    /// Copies the offscreen surface onto `target` at the origin, then draws
    /// the frame outline on top. Does nothing before the first `resize`, or
    /// when no target is available.
    pub fn render(&self, target: Option<&mut Surface>) {
        if let (ViewState::Sized { surface, frame }, Some(target)) = (&self.state, target) {
            raster::blit(target, surface);
            raster::stroke_rect(target, frame.min, frame.max, &self.pen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeTracker;

    const BG: Color = Color::rgb(0xff, 0xff, 0xff);
    const INK: Color = Color::rgb(0x11, 0x11, 0x11);
    const TRIM: Color = Color::rgb(0x00, 0x33, 0xcc);

    fn compositor(inset: u32) -> Compositor {
        Compositor::new(BG, inset, Pen::new(TRIM, 4.0))
    }

    fn offscreen(c: &Compositor) -> &Surface {
        match &c.state {
            ViewState::Sized { surface, .. } => surface,
            ViewState::Unsized => panic!("compositor has no surface"),
        }
    }

    fn assert_all_background(surface: &Surface) {
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                assert_eq!(surface.pixel(x, y), BG, "stray pixel at {x},{y}");
            }
        }
    }

    #[test]
    fn resize_fills_surface_with_background() {
        let mut c = compositor(40);
        c.resize(100, 80);
        assert_all_background(offscreen(&c));
    }

    #[test]
    fn resize_recomputes_frame_from_inset() {
        let mut c = compositor(10);
        c.resize(100, 80);
        match &c.state {
            ViewState::Sized { frame, .. } => {
                assert_eq!(frame.min, vec2(10.0, 10.0));
                assert_eq!(frame.max, vec2(90.0, 70.0));
            }
            ViewState::Unsized => panic!("resize did not size the compositor"),
        }
    }

    #[test]
    fn resize_discards_previous_drawing() {
        let mut c = compositor(10);
        c.resize(100, 100);
        c.commit_segment(
            &QuadSegment {
                from: vec2(20.0, 20.0),
                ctrl: vec2(50.0, 20.0),
                to: vec2(80.0, 80.0),
            },
            &Pen::new(INK, 6.0),
        );
        assert_eq!(offscreen(&c).pixel(20, 20), INK);

        c.resize(50, 50);
        assert_eq!(offscreen(&c).width(), 50);
        assert_eq!(offscreen(&c).height(), 50);
        assert_all_background(offscreen(&c));
    }

    #[test]
    fn ignored_moves_leave_rendering_untouched() {
        let mut c = compositor(10);
        c.resize(40, 40);
        let mut tracker = StrokeTracker::new(5.0);

        tracker.on_start(vec2(20.0, 20.0));
        if let Some(seg) = tracker.on_move(vec2(30.0, 20.0)) {
            c.commit_segment(&seg, &Pen::new(INK, 4.0));
        }
        let mut before = Surface::new(40, 40, Color::rgb(0, 0, 0));
        c.render(Some(&mut before));

        // Within tolerance of the (30, 20) anchor on both axes: no segment,
        // and the rendered output stays pixel-identical.
        assert_eq!(tracker.on_move(vec2(32.0, 21.0)), None);
        let mut after = Surface::new(40, 40, Color::rgb(0, 0, 0));
        c.render(Some(&mut after));
        assert_eq!(before.data(), after.data());
    }

    #[test]
    fn render_before_resize_is_a_noop() {
        let c = compositor(10);
        let mut target = Surface::new(20, 20, INK);
        c.render(Some(&mut target));
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(target.pixel(x, y), INK);
            }
        }
    }

    #[test]
    fn render_without_target_is_a_noop() {
        let mut c = compositor(10);
        c.resize(30, 30);
        c.render(None);
    }

    #[test]
    fn commit_before_resize_is_ignored() {
        let mut c = compositor(10);
        c.commit_segment(
            &QuadSegment {
                from: vec2(1.0, 1.0),
                ctrl: vec2(2.0, 2.0),
                to: vec2(3.0, 3.0),
            },
            &Pen::new(INK, 6.0),
        );
    }

    #[test]
    fn render_composites_drawing_and_frame() {
        let mut c = compositor(10);
        c.resize(60, 60);
        c.commit_segment(
            &QuadSegment {
                from: vec2(30.0, 30.0),
                ctrl: vec2(30.0, 30.0),
                to: vec2(30.0, 30.0),
            },
            &Pen::new(INK, 6.0),
        );

        let mut target = Surface::new(60, 60, Color::rgb(0, 0, 0));
        c.render(Some(&mut target));

        // Committed drawing and frame outline both reach the target.
        assert_eq!(target.pixel(30, 30), INK);
        assert_eq!(target.pixel(30, 10), TRIM);
        // The frame is only composited, never drawn into the offscreen
        // surface.
        assert_eq!(offscreen(&c).pixel(30, 10), BG);
    }
}
