// MiBuddy — Face Renderer
//
// Rasterises a FaceParams record with embedded-graphics primitives. All
// geometry is authored against a 200 px design canvas and scaled to the
// on-screen face canvas. Rotation moves the features around the face centre;
// the primitives themselves stay axis aligned.

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Ellipse, Line, Polyline, PrimitiveStyle, Rectangle};

use crate::config::FACE_CANVAS_SIZE;

use super::theme::Palette;
use super::types::{FaceParams, MouthType};

const DESIGN_SIZE: f32 = 200.0;

const FACE_RX: f32 = 85.0;
const FACE_RY: f32 = 75.0;
const EYE_SPACING: f32 = 35.0;
const EYE_Y: f32 = -10.0;
const EYE_W: f32 = 22.0;
const EYE_H: f32 = 28.0;
const EYE_MIN_H: i32 = 4;
const MOUTH_Y: f32 = 40.0;
const BLUSH_X: f32 = 55.0;
const BLUSH_Y: f32 = 20.0;
const BLUSH_RX: f32 = 18.0;
const BLUSH_RY: f32 = 10.0;
const MOUTH_STROKE: u32 = 3;

#[inline]
fn scale(v: f32) -> f32 {
    v * FACE_CANVAS_SIZE as f32 / DESIGN_SIZE
}

#[inline]
fn rgb(c: Rgb888) -> Rgb565 {
    Rgb565::from(c)
}

fn fill(c: Rgb888) -> PrimitiveStyle<Rgb565> {
    PrimitiveStyle::with_fill(rgb(c))
}

fn stroke(c: Rgb888, width: u32) -> PrimitiveStyle<Rgb565> {
    PrimitiveStyle::with_stroke(rgb(c), width)
}

/// Ellipse given by centre and full size.
fn ellipse(center: Point, w: i32, h: i32) -> Ellipse {
    let size = Size::new(w.max(1) as u32, h.max(1) as u32);
    Ellipse::with_center(center, size)
}

/// Rotates design-space offsets around the face centre.
struct Frame {
    origin: Point,
    sin: f32,
    cos: f32,
}

impl Frame {
    fn new(origin: Point, rotation_deg: f32) -> Self {
        let r = rotation_deg.to_radians();
        Self { origin, sin: r.sin(), cos: r.cos() }
    }

    /// Screen point for an offset already in screen pixels.
    fn at(&self, dx: f32, dy: f32) -> Point {
        let x = dx * self.cos - dy * self.sin;
        let y = dx * self.sin + dy * self.cos;
        self.origin + Point::new(x.round() as i32, y.round() as i32)
    }
}

/// Screen-space eye box after scale and squish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeBox {
    pub w: i32,
    pub h: i32,
}

pub fn eye_box(face: &FaceParams) -> EyeBox {
    let w = scale(EYE_W * face.eye_scale).round() as i32;
    let h = (scale(EYE_H * face.eye_scale) * (1.0 - face.eye_squish)).round() as i32;
    EyeBox { w: w.max(EYE_MIN_H), h: h.max(EYE_MIN_H) }
}

/// Draw the whole face centred on `center`.
pub fn draw_face<D>(target: &mut D, center: Point, face: &FaceParams, palette: &Palette) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let origin = center + Point::new(face.face_offset_x.round() as i32, face.face_offset_y.round() as i32);
    let frame = Frame::new(origin, face.face_rotation);

    // body
    let fw = (scale(FACE_RX * 2.0) * (1.0 + face.face_squish)).round() as i32;
    let fh = (scale(FACE_RY * 2.0) * (1.0 - face.face_squish)).round() as i32;
    ellipse(origin + Point::new(0, 3), fw, fh).into_styled(fill(palette.face_shadow)).draw(target)?;
    ellipse(origin, fw, fh).into_styled(fill(palette.face)).draw(target)?;
    ellipse(frame.at(-scale(30.0), -scale(35.0)), fw / 3, fh / 4)
        .into_styled(fill(palette.face_highlight))
        .draw(target)?;

    if face.show_blush {
        for side in [-1.0, 1.0] {
            let c = frame.at(side * scale(BLUSH_X), scale(BLUSH_Y));
            ellipse(c, scale(BLUSH_RX * 2.0) as i32, scale(BLUSH_RY * 2.0) as i32)
                .into_styled(fill(palette.blush))
                .draw(target)?;
        }
    }

    draw_eyes(target, &frame, face, palette)?;
    draw_mouth(target, &frame, face, palette)
}

fn draw_eyes<D>(target: &mut D, frame: &Frame, face: &FaceParams, palette: &Palette) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let eye = eye_box(face);
    for side in [-1.0, 1.0] {
        let c = frame.at(
            side * scale(EYE_SPACING) + face.eye_offset_x,
            scale(EYE_Y) + face.eye_offset_y,
        );
        ellipse(c, eye.w, eye.h).into_styled(fill(palette.eye)).draw(target)?;

        if eye.h > 8 {
            let d = ((eye.w as f32) * 0.5 * face.pupil_size).round().max(2.0) as u32;
            Circle::with_center(c + Point::new(0, eye.h / 8), d)
                .into_styled(fill(palette.pupil))
                .draw(target)?;
        }
        if eye.h > 10 {
            Circle::with_center(c + Point::new(-eye.w / 5, -eye.h / 5), (eye.w / 3).max(2) as u32)
                .into_styled(fill(palette.face_highlight))
                .draw(target)?;
        }
        if eye.h > 12 && face.show_sparkle {
            Circle::with_center(c + Point::new(eye.w / 5, eye.h / 6), 2)
                .into_styled(fill(palette.face_highlight))
                .draw(target)?;
        }
    }
    Ok(())
}

fn draw_mouth<D>(target: &mut D, frame: &Frame, face: &FaceParams, palette: &Palette) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let c = frame.at(0.0, scale(MOUTH_Y));
    let open = face.mouth_open.clamp(0.0, 1.0);
    let line = stroke(palette.mouth, MOUTH_STROKE);

    match face.mouth_type {
        MouthType::Smile => {
            let half = scale(16.0);
            let depth = scale(6.0 + 10.0 * open);
            let pts = curve(c, half, |u| depth * (1.0 - u * u));
            Polyline::new(&pts).into_styled(line).draw(target)?;
        }
        MouthType::OpenSmile => {
            let w = scale(34.0) as i32;
            let h = scale(12.0 + 24.0 * open) as i32;
            ellipse(c, w, h).into_styled(fill(palette.mouth)).draw(target)?;
            // cover the upper half to leave a D shape
            Rectangle::new(c - Point::new(w / 2 + 1, h / 2 + 1), Size::new(w as u32 + 2, (h / 2 + 1) as u32))
                .into_styled(fill(palette.face))
                .draw(target)?;
        }
        MouthType::SmallO => {
            let w = scale(14.0 + 6.0 * open) as i32;
            let h = scale(10.0 + 16.0 * open) as i32;
            ellipse(c, w, h).into_styled(line).draw(target)?;
        }
        MouthType::Smirk => {
            let half = scale(14.0);
            let pts = curve(c, half, |u| if u > 0.0 { -scale(6.0) * u } else { scale(2.0) * u * u });
            Polyline::new(&pts).into_styled(line).draw(target)?;
        }
        MouthType::Flat => {
            let half = scale(14.0) as i32;
            Line::new(c - Point::new(half, 0), c + Point::new(half, 0))
                .into_styled(line)
                .draw(target)?;
        }
        MouthType::Wavy => {
            let half = scale(20.0);
            let amp = scale(4.0);
            let pts = curve(c, half, |u| (u * core::f32::consts::PI * 2.0).sin() * amp);
            Polyline::new(&pts).into_styled(line).draw(target)?;
        }
        MouthType::Scream => {
            let w = scale(28.0) as i32;
            let h = scale(18.0 + 26.0 * open) as i32;
            ellipse(c, w, h).into_styled(fill(palette.mouth)).draw(target)?;
            ellipse(c + Point::new(0, h / 4), w / 2, h / 3)
                .into_styled(fill(palette.blush))
                .draw(target)?;
        }
    }
    Ok(())
}

/// Nine points across `[-half, half]` with `dy(u)` for `u` in `[-1, 1]`.
fn curve(c: Point, half: f32, dy: impl Fn(f32) -> f32) -> [Point; 9] {
    let mut pts = [Point::zero(); 9];
    for (i, p) in pts.iter_mut().enumerate() {
        let u = i as f32 / 4.0 - 1.0;
        *p = c + Point::new((u * half).round() as i32, dy(u).round() as i32);
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mochi::assets::default_face;
    use crate::mochi::types::EmotionalState;
    use crate::scene::FrameBuffer;

    #[test]
    fn eye_box_respects_minimum_height() {
        let sleepy = default_face(EmotionalState::Sleepy);
        let eye = eye_box(&sleepy);
        assert_eq!(eye.h, EYE_MIN_H);

        let happy = eye_box(&default_face(EmotionalState::Happy));
        assert_eq!(happy, EyeBox { w: 13, h: 17 });
    }

    #[test]
    fn face_is_drawn_at_its_offset() {
        let palette = crate::mochi::types::Theme::Mint.palette();
        let mut fb = FrameBuffer::new(240, 284);
        fb.clear(rgb(palette.bg)).unwrap();

        let face = FaceParams { face_offset_x: -40.0, ..FaceParams::default() };
        draw_face(&mut fb, Point::new(120, 142), &face, palette).unwrap();

        assert_eq!(fb.pixel(Point::new(80, 185)), Some(rgb(palette.face)));
        assert_eq!(fb.pixel(Point::new(235, 142)), Some(rgb(palette.bg)));
    }

    #[test]
    fn every_mouth_shape_draws() {
        let palette = crate::mochi::types::Theme::Peach.palette();
        let mut fb = FrameBuffer::new(240, 284);
        for mouth_type in [
            MouthType::Smile,
            MouthType::OpenSmile,
            MouthType::SmallO,
            MouthType::Smirk,
            MouthType::Flat,
            MouthType::Wavy,
            MouthType::Scream,
        ] {
            fb.clear(rgb(palette.bg)).unwrap();
            let face = FaceParams { mouth_type, mouth_open: 0.8, ..FaceParams::default() };
            draw_face(&mut fb, Point::new(120, 142), &face, palette).unwrap();
            let mouth_px = fb.count(rgb(palette.mouth));
            assert!(mouth_px > 10, "{mouth_type:?} drew {mouth_px} px");
        }
    }
}
