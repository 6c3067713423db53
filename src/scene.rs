// MiBuddy — Retained Scene
//
// Implements the Display primitive as a flat list of objects in draw order.
// `render` rasterises every visible object through embedded-graphics into any
// RGB565 draw target; on the device that is the LCD frame buffer.

use core::convert::Infallible;

use embedded_graphics::image::{Image, ImageRawLE};
use embedded_graphics::mono_font::{ascii::FONT_9X15, MonoTextStyle};
use embedded_graphics::pixelcolor::{IntoStorage, Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Ellipse, Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Text};
use log::{debug, warn};

use crate::error::{MochiError, Result};
use crate::mochi::face;
use crate::mochi::theme::Palette;
use crate::mochi::types::FaceParams;
use crate::platform::{Display, ImageSource, ObjectId, ObjectKind, ParticleShape, Transform};

/// Parent of everything; always exists.
pub const ROOT: ObjectId = ObjectId(0);

pub const DEFAULT_CAPACITY: usize = 48;

// ---------------------------------------------------------------------------
// Frame buffer
// ---------------------------------------------------------------------------
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb565>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; (width * height) as usize],
        }
    }

    fn index(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width as i32 || p.y >= self.height as i32 {
            return None;
        }
        Some(p.y as usize * self.width as usize + p.x as usize)
    }

    pub fn pixel(&self, p: Point) -> Option<Rgb565> {
        self.index(p).map(|i| self.pixels[i])
    }

    pub fn count(&self, color: Rgb565) -> usize {
        self.pixels.iter().filter(|c| **c == color).count()
    }

    /// One row as big-endian RGB565, the byte order the panel expects.
    pub fn row_be_bytes(&self, y: u32, out: &mut Vec<u8>) {
        out.clear();
        let start = (y * self.width) as usize;
        for px in &self.pixels[start..start + self.width as usize] {
            out.extend_from_slice(&px.into_storage().to_be_bytes());
        }
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if let Some(i) = self.index(p) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scene objects
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub parent: ObjectId,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub visible: bool,
    pub image: Option<ImageSource>,
    pub text: String,
    pub face: Option<(FaceParams, Palette)>,
}

pub struct Scene {
    next_id: u32,
    capacity: usize,
    objects: Vec<SceneObject>,
    background: Rgb888,
    dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn blend(fg: Rgb888, bg: Rgb888, opacity: u8) -> Rgb888 {
    let mix = |f: u8, b: u8| ((f as u16 * opacity as u16 + b as u16 * (255 - opacity as u16)) / 255) as u8;
    Rgb888::new(mix(fg.r(), bg.r()), mix(fg.g(), bg.g()), mix(fg.b(), bg.b()))
}

impl Scene {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: 1,
            capacity,
            objects: Vec::with_capacity(capacity),
            background: Rgb888::BLACK,
            dirty: true,
        }
    }

    pub fn root(&self) -> ObjectId {
        ROOT
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get(&self, obj: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == obj)
    }

    fn get_mut(&mut self, obj: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == obj)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Object and all its ancestors are visible.
    pub fn is_shown(&self, obj: ObjectId) -> bool {
        let mut cur = obj;
        while cur != ROOT {
            match self.get(cur) {
                Some(o) if o.visible => cur = o.parent,
                _ => return false,
            }
        }
        true
    }

    /// Returns and clears the "something changed" flag.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }

    fn touch(&mut self) {
        self.dirty = true;
    }

    /// Draw every shown object in list order over the background colour.
    pub fn render<D>(&self, target: &mut D) -> core::result::Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        target.clear(Rgb565::from(self.background))?;
        for obj in self.objects.iter().filter(|o| self.is_shown(o.id)) {
            self.render_object(target, obj)?;
        }
        Ok(())
    }

    fn render_object<D>(&self, target: &mut D, obj: &SceneObject) -> core::result::Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let t = &obj.transform;
        let center = Point::new(t.x, t.y);
        let color = Rgb565::from(blend(t.color, self.background, t.opacity));

        match obj.kind {
            ObjectKind::Container => {}
            ObjectKind::Face => {
                if let Some((params, palette)) = &obj.face {
                    face::draw_face(target, center, params, palette)?;
                }
            }
            ObjectKind::Particle(shape) => match shape {
                ParticleShape::Dot => {
                    Circle::with_center(center, t.size.max(1))
                        .into_styled(PrimitiveStyle::with_fill(color))
                        .draw(target)?;
                }
                ParticleShape::Ring => {
                    Circle::with_center(center, t.size.max(1))
                        .into_styled(PrimitiveStyle::with_stroke(color, 2))
                        .draw(target)?;
                }
                ParticleShape::Drop => {
                    Ellipse::with_center(center, Size::new(t.size, t.size * 3 / 2))
                        .into_styled(PrimitiveStyle::with_fill(color))
                        .draw(target)?;
                }
                ParticleShape::Star => {
                    let r = t.size as f32 / 2.0;
                    for arm in [0.0f32, 90.0] {
                        let a = (t.rotation_deg + arm).to_radians();
                        let d = Point::new((a.cos() * r).round() as i32, (a.sin() * r).round() as i32);
                        Line::new(center - d, center + d)
                            .into_styled(PrimitiveStyle::with_stroke(color, 2))
                            .draw(target)?;
                    }
                }
                ParticleShape::Glyph(_) => self.render_text(target, center, &obj.text, color)?,
            },
            ObjectKind::Label => self.render_text(target, center, &obj.text, color)?,
            ObjectKind::Sprite | ObjectKind::Background => match &obj.image {
                Some(ImageSource::Embedded(img)) => {
                    let raw = ImageRawLE::<Rgb565>::new(img.data, img.width);
                    let top_left = center - Point::new(img.width as i32 / 2, img.height as i32 / 2);
                    Image::new(&raw, top_left).draw(target)?;
                }
                // SD images are decoded by the panel-side filesystem driver
                Some(ImageSource::Path(_)) | None => {}
            },
        }
        Ok(())
    }

    fn render_text<D>(&self, target: &mut D, at: Point, text: &str, color: Rgb565) -> core::result::Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if text.is_empty() {
            return Ok(());
        }
        let style = MonoTextStyle::new(&FONT_9X15, color);
        Text::with_alignment(text, at, style, Alignment::Center).draw(target)?;
        Ok(())
    }
}

impl Display for Scene {
    fn create(&mut self, parent: ObjectId, kind: ObjectKind) -> Result<ObjectId> {
        if parent != ROOT && self.get(parent).is_none() {
            return Err(MochiError::invalid_arg(format!("unknown parent {:?}", parent)));
        }
        if self.objects.len() >= self.capacity {
            warn!(target: "mochi", "Scene full ({} objects)", self.capacity);
            return Err(MochiError::ResourceExhausted("display objects"));
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(SceneObject {
            id,
            parent,
            kind,
            transform: Transform::default(),
            visible: true,
            image: None,
            text: String::new(),
            face: None,
        });
        self.touch();
        Ok(id)
    }

    fn destroy(&mut self, obj: ObjectId) {
        let mut doomed = vec![obj];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(self.objects.iter().filter(|o| o.parent == parent).map(|o| o.id));
            i += 1;
        }
        self.objects.retain(|o| !doomed.contains(&o.id));
        self.touch();
    }

    fn exists(&self, obj: ObjectId) -> bool {
        obj == ROOT || self.get(obj).is_some()
    }

    fn set_transform(&mut self, obj: ObjectId, transform: &Transform) {
        if let Some(o) = self.get_mut(obj) {
            o.transform = *transform;
            self.touch();
        }
    }

    fn set_visible(&mut self, obj: ObjectId, visible: bool) {
        if let Some(o) = self.get_mut(obj) {
            o.visible = visible;
            self.touch();
        }
    }

    fn bind_image(&mut self, obj: ObjectId, source: ImageSource) -> Result<()> {
        let o = self
            .get_mut(obj)
            .ok_or_else(|| MochiError::invalid_arg(format!("unknown image object {:?}", obj)))?;
        debug!(target: "mochi_asset", "Bind {:?} -> {:?}", obj, source);
        o.image = Some(source);
        self.touch();
        Ok(())
    }

    fn set_text(&mut self, obj: ObjectId, text: &str) {
        if let Some(o) = self.get_mut(obj) {
            if o.text != text {
                o.text.clear();
                o.text.push_str(text);
                self.touch();
            }
        }
    }

    fn move_to_back(&mut self, obj: ObjectId) {
        if let Some(pos) = self.objects.iter().position(|o| o.id == obj) {
            let o = self.objects.remove(pos);
            self.objects.insert(0, o);
            self.touch();
        }
    }

    fn draw_face(&mut self, obj: ObjectId, face: &FaceParams, palette: &Palette) {
        if let Some(o) = self.get_mut(obj) {
            o.face = Some((*face, *palette));
            self.touch();
        }
    }

    fn set_background_color(&mut self, color: Rgb888) {
        self.background = color;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_removes_children() {
        let mut scene = Scene::default();
        let parent = scene.create(ROOT, ObjectKind::Container).unwrap();
        let child = scene.create(parent, ObjectKind::Face).unwrap();
        scene.create(ROOT, ObjectKind::Label).unwrap();
        scene.destroy(parent);
        assert!(!scene.exists(child));
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut scene = Scene::default();
        let err = scene.create(ObjectId(42), ObjectKind::Face).unwrap_err();
        assert!(matches!(err, MochiError::InvalidArgument(_)));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut scene = Scene::new(2);
        scene.create(ROOT, ObjectKind::Container).unwrap();
        scene.create(ROOT, ObjectKind::Container).unwrap();
        assert_eq!(
            scene.create(ROOT, ObjectKind::Container),
            Err(MochiError::ResourceExhausted("display objects"))
        );
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut scene = Scene::default();
        let parent = scene.create(ROOT, ObjectKind::Container).unwrap();
        let child = scene.create(parent, ObjectKind::Label).unwrap();
        scene.set_visible(parent, false);
        assert!(!scene.is_shown(child));
        scene.set_visible(parent, true);
        assert!(scene.is_shown(child));
    }

    #[test]
    fn move_to_back_reorders() {
        let mut scene = Scene::default();
        let a = scene.create(ROOT, ObjectKind::Face).unwrap();
        let b = scene.create(ROOT, ObjectKind::Background).unwrap();
        scene.move_to_back(b);
        let order: Vec<ObjectId> = scene.objects().map(|o| o.id).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn render_paints_background_and_dots() {
        let mut scene = Scene::default();
        scene.set_background_color(Rgb888::new(0, 0, 0));
        let dot = scene.create(ROOT, ObjectKind::Particle(ParticleShape::Dot)).unwrap();
        scene.set_transform(
            dot,
            &Transform { x: 10, y: 10, size: 6, color: Rgb888::new(255, 0, 0), ..Transform::default() },
        );
        let mut fb = FrameBuffer::new(32, 32);
        scene.render(&mut fb).unwrap();
        assert_eq!(fb.pixel(Point::new(10, 10)), Some(Rgb565::from(Rgb888::new(255, 0, 0))));
        assert_eq!(fb.pixel(Point::new(30, 30)), Some(Rgb565::BLACK));
    }

    #[test]
    fn dirty_flag_tracks_changes() {
        let mut scene = Scene::default();
        assert!(scene.take_dirty());
        assert!(!scene.take_dirty());
        let label = scene.create(ROOT, ObjectKind::Label).unwrap();
        scene.take_dirty();
        scene.set_text(label, "Happy + Idle");
        assert!(scene.take_dirty());
        scene.set_text(label, "Happy + Idle");
        assert!(!scene.take_dirty());
    }
}
