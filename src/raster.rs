use crate::{
    canvas::Surface,
    math::{lerp, vec2, Vec2f},
    pen::{Cap, Color, Join, Pen},
    stroke::QuadSegment,
};

/// Strokes a quadratic segment by stamping pen tips along the curve.
///
/// Stamps are spaced half a pen radius apart, close enough that the tip
/// discs fuse into a solid line with round caps and joins.
pub fn stroke_quad(surface: &mut Surface, seg: &QuadSegment, pen: &Pen) {
    let spacing = stamp_spacing(pen);
    let arc_estimate = seg.from.dist(seg.ctrl) + seg.ctrl.dist(seg.to);
    let steps = (arc_estimate / spacing).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let p = lerp(lerp(seg.from..=seg.ctrl, t)..=lerp(seg.ctrl..=seg.to, t), t);
        stamp_tip(surface, p, pen);
    }
}

/// Strokes the outline of the axis-aligned rectangle spanned by `min` and
/// `max`.
pub fn stroke_rect(surface: &mut Surface, min: Vec2f, max: Vec2f, pen: &Pen) {
    let corners = [
        min,
        vec2(max.x(), min.y()),
        max,
        vec2(min.x(), max.y()),
    ];
    for i in 0..corners.len() {
        stamp_line(surface, corners[i], corners[(i + 1) % corners.len()], pen);
    }
}

/// Copies `src` onto `dst` at the origin, unscaled, clipped to `dst`.
pub fn blit(dst: &mut Surface, src: &Surface) {
    let w = dst.width().min(src.width()) as usize;
    let h = dst.height().min(src.height());
    let src_stride = src.width() as usize;
    let dst_stride = dst.width() as usize;
    for y in 0..h as usize {
        let s = y * src_stride;
        let d = y * dst_stride;
        dst.data_mut()[d..d + w].copy_from_slice(&src.data()[s..s + w]);
    }
}

fn stamp_spacing(pen: &Pen) -> f32 {
    (pen.stroke_width * 0.25).max(0.5)
}

fn stamp_line(surface: &mut Surface, a: Vec2f, b: Vec2f, pen: &Pen) {
    let steps = (a.dist(b) / stamp_spacing(pen)).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let p = lerp(a..=b, i as f32 / steps as f32);
        stamp_tip(surface, p, pen);
    }
}

/// Stamps one pen tip disc centered on `center`, blending per-pixel coverage
/// sampled at pixel centers over the clamped bounding box of the disc.
fn stamp_tip(surface: &mut Surface, center: Vec2f, pen: &Pen) {
    let Pen {
        color,
        stroke_width,
        cap: Cap::Round,
        join: Join::Round,
        antialias,
        dither,
    } = *pen;
    let radius = stroke_width / 2.0;

    let [cx, cy]: [f32; 2] = center.into();
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil() + 1.0).min(surface.width() as f32) as u32;
    let y1 = ((cy + radius).ceil() + 1.0).min(surface.height() as f32) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let dist = vec2(x as f32 + 0.5, y as f32 + 0.5).dist(center);
            let coverage = tip_coverage(dist, radius, antialias);
            blend_pixel(surface, x, y, color, coverage, dither);
        }
    }
}

/// Coverage of a point `dist` away from the tip center. Hard edge at the
/// radius without antialiasing; a smoothstep falloff over the outermost
/// pixel of the radius with it.
fn tip_coverage(dist: f32, radius: f32, antialias: bool) -> f32 {
    if !antialias {
        return if dist <= radius { 1.0 } else { 0.0 };
    }

    let fade = radius.min(1.0);
    let solid = radius - fade;
    if dist <= solid {
        1.0
    } else if dist >= radius {
        0.0
    } else {
        let x = 1.0 - (dist - solid) / fade;
        x * x * (3.0 - 2.0 * x)
    }
}

/// Source-over blend of `color` into one pixel, weighted by `coverage`.
///
/// With `dither`, the rounding constant used when quantizing back to 8 bits
/// is replaced by an ordered 4x4 Bayer threshold, trading banding for noise.
fn blend_pixel(surface: &mut Surface, x: u32, y: u32, color: Color, coverage: f32, dither: bool) {
    if coverage <= 0.0 {
        return;
    }
    let alpha = coverage * color.a() as f32 / 255.0;
    if alpha >= 1.0 {
        surface.set_pixel(x, y, color);
        return;
    }

    const BAYER: [[u8; 4]; 4] = [
        [0, 8, 2, 10],
        [12, 4, 14, 6],
        [3, 11, 1, 9],
        [15, 7, 13, 5],
    ];
    let round = if dither {
        (BAYER[(y % 4) as usize][(x % 4) as usize] as f32 + 0.5) / 16.0
    } else {
        0.5
    };

    let dst = surface.pixel(x, y);
    let mix = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha) + round) as u8;
    // The blend weight already carries the source alpha, so the alpha
    // channel blends from fully opaque.
    let blended = Color::argb(
        mix(0xff, dst.a()),
        mix(color.r(), dst.r()),
        mix(color.g(), dst.g()),
        mix(color.b(), dst.b()),
    );
    surface.set_pixel(x, y, blended);
}
