// MiBuddy — Particle Overlay Engine
//
// A fixed pool of decorative objects per particle type. Positions are
// recomputed from the frame counter every tick; nothing is integrated.
// Changing type tears the pool down and builds a new one. `None` leaves the
// pool empty and stops the timer.

use core::f32::consts::PI;

use embedded_graphics::pixelcolor::Rgb888;
use heapless::Vec;
use log::{debug, info};

use crate::config::{CENTER_X, CENTER_Y};
use crate::error::{MochiError, Result};
use crate::platform::{Display, ObjectId, ObjectKind, ParticleShape, Transform};
use crate::timer::PeriodicTimer;

use super::theme::{Palette, SWEAT_COLOR};
use super::types::{ParticleType, Theme};

pub const MAX_PARTICLES: usize = 8;

const OPA_60: u8 = 153;
const OPA_70: u8 = 178;
const OPA_80: u8 = 204;

const ZZZ_GLYPHS: [&str; 3] = ["Z", "z", "z"];

/// Where one particle sits on a given frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSlot {
    pub x: i32,
    pub y: i32,
    pub size: u32,
    pub rotation_deg: f32,
    pub opacity: u8,
}

fn shape_of(kind: ParticleType, i: usize) -> ParticleShape {
    match kind {
        ParticleType::Sweat => ParticleShape::Drop,
        ParticleType::Sparkle => ParticleShape::Star,
        ParticleType::Spiral => ParticleShape::Ring,
        ParticleType::Zzz => ParticleShape::Glyph(ZZZ_GLYPHS[i % ZZZ_GLYPHS.len()]),
        ParticleType::None | ParticleType::Float | ParticleType::Burst => ParticleShape::Dot,
    }
}

fn color_of(kind: ParticleType, palette: &Palette) -> Rgb888 {
    match kind {
        ParticleType::Float => palette.particle,
        ParticleType::Sweat => SWEAT_COLOR,
        _ => palette.accent,
    }
}

/// Closed-form placement of particle `i` of `kind` at `frame`.
pub fn layout(kind: ParticleType, i: usize, frame: u32, period_ms: u32) -> ParticleSlot {
    let t = frame as f32 * period_ms as f32 / 1000.0;
    let fi = i as f32;
    let cx = CENTER_X as f32;
    let cy = CENTER_Y as f32;

    match kind {
        ParticleType::Float => ParticleSlot {
            x: (cx + (t * 0.02 + fi * 1.5).sin() * 100.0 - 50.0) as i32,
            y: (30.0 + (t * 0.015 + fi * 1.2).cos() * 60.0 + fi * 25.0) as i32,
            size: (6.0 + (t * 0.05 + fi).sin() * 2.0) as u32,
            rotation_deg: 0.0,
            opacity: (100.0 + (t * 0.03 + fi).sin() * 50.0) as u8,
        },
        ParticleType::Burst => {
            let count = ParticleType::Burst.pool_size() as f32;
            let angle = fi / count * 2.0 * PI + t * 0.1;
            let dist = 80.0 + (t * 0.2 + fi).sin() * 20.0;
            ParticleSlot {
                x: (cx + angle.cos() * dist) as i32,
                y: (cy + angle.sin() * dist * 0.6) as i32,
                size: 8,
                rotation_deg: 0.0,
                opacity: OPA_60,
            }
        }
        ParticleType::Sweat => {
            let drip = ((frame * 2) % 60) as i32;
            let (x, y) = if i == 0 {
                (CENTER_X - 75, 60 + drip)
            } else {
                (CENTER_X + 70, 50 + (drip + 20) % 60)
            };
            // drops are 8x12, anchored at their top-left corner
            ParticleSlot { x: x + 4, y: y + 6, size: 8, rotation_deg: 0.0, opacity: OPA_70 }
        }
        ParticleType::Sparkle => ParticleSlot {
            x: (80.0 + fi * 45.0 + (t * 0.1 + fi).sin() * 10.0) as i32,
            y: (50.0 + (t * 0.08 + fi * 2.0).cos() * 30.0) as i32,
            size: 10,
            rotation_deg: ((frame * 3 + i as u32 * 45) % 360) as f32,
            opacity: OPA_70,
        },
        ParticleType::Spiral => {
            let angle = t * 0.15 + fi * 2.0;
            ParticleSlot {
                x: (cx + angle.cos() * (40.0 + fi * 20.0)) as i32,
                y: (cy - 30.0 + angle.sin() * (30.0 + fi * 15.0)) as i32,
                size: 12,
                rotation_deg: 0.0,
                opacity: OPA_60,
            }
        }
        ParticleType::Zzz => {
            let drift = (t * 0.05).sin() * 5.0;
            let base_x = (CENTER_X + 55) as f32;
            let (x, y) = match i {
                0 => (base_x + drift, 60),
                1 => (base_x + 15.0 + drift * 0.7, 45),
                _ => (base_x + 25.0 + drift * 0.5, 35),
            };
            ParticleSlot {
                x: x as i32,
                y,
                size: 14,
                rotation_deg: 0.0,
                opacity: OPA_80.saturating_sub(i as u8 * 20),
            }
        }
        ParticleType::None => ParticleSlot { x: 0, y: 0, size: 0, rotation_deg: 0.0, opacity: 0 },
    }
}

pub struct ParticleEngine {
    kind: ParticleType,
    theme: Theme,
    objects: Vec<ObjectId, MAX_PARTICLES>,
    frame: u32,
    timer: PeriodicTimer,
    suspended: bool,
}

impl ParticleEngine {
    pub fn new(period_ms: u32) -> Self {
        Self {
            kind: ParticleType::None,
            theme: Theme::default(),
            objects: Vec::new(),
            frame: 0,
            timer: PeriodicTimer::paused(period_ms),
            suspended: false,
        }
    }

    pub fn kind(&self) -> ParticleType {
        self.kind
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Switch the pool to `kind` in `theme` colours. The same pair twice is a no-op.
    pub fn set_type<D: Display + ?Sized>(
        &mut self,
        display: &mut D,
        parent: ObjectId,
        kind: ParticleType,
        theme: Theme,
    ) -> Result<()> {
        if kind == self.kind && theme == self.theme {
            debug!(target: "mochi_particles", "Type {:?} unchanged", kind);
            return Ok(());
        }
        info!(target: "mochi_particles", "Setting particle type: {:?}", kind);

        self.clear(display);
        self.kind = kind;
        self.theme = theme;
        self.frame = 0;

        if kind == ParticleType::None {
            self.timer.pause();
            return Ok(());
        }

        let palette = theme.palette();
        let color = color_of(kind, palette);
        for i in 0..kind.pool_size() {
            let obj = display.create(parent, ObjectKind::Particle(shape_of(kind, i)))?;
            if self.objects.push(obj).is_err() {
                display.destroy(obj);
                return Err(MochiError::ResourceExhausted("particle pool"));
            }
            if let ParticleShape::Glyph(text) = shape_of(kind, i) {
                display.set_text(obj, text);
            }
            self.place(display, i, obj, color);
        }

        if !self.suspended {
            self.timer.resume();
        }
        Ok(())
    }

    fn place<D: Display + ?Sized>(&self, display: &mut D, i: usize, obj: ObjectId, color: Rgb888) {
        let slot = layout(self.kind, i, self.frame, self.timer.period_ms());
        display.set_transform(
            obj,
            &Transform {
                x: slot.x,
                y: slot.y,
                size: slot.size,
                rotation_deg: slot.rotation_deg,
                opacity: slot.opacity,
                color,
            },
        );
    }

    /// Advance one frame when due. Returns `true` if particles moved.
    pub fn poll<D: Display + ?Sized>(&mut self, display: &mut D, now_ms: u32) -> bool {
        if self.objects.is_empty() || !self.timer.poll(now_ms) {
            return false;
        }
        self.frame = self.frame.wrapping_add(1);
        let color = color_of(self.kind, self.theme.palette());
        for (i, obj) in self.objects.iter().enumerate() {
            self.place(display, i, *obj, color);
        }
        true
    }

    pub fn pause(&mut self) {
        self.suspended = true;
        self.timer.pause();
    }

    pub fn resume(&mut self) {
        self.suspended = false;
        if self.kind != ParticleType::None {
            self.timer.resume();
        }
    }

    /// Destroy every particle object. The type is forgotten so the next
    /// [`set_type`](Self::set_type) rebuilds.
    pub fn clear<D: Display + ?Sized>(&mut self, display: &mut D) {
        for obj in self.objects.iter() {
            display.destroy(*obj);
        }
        self.objects.clear();
        self.kind = ParticleType::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweat_drips_and_wraps() {
        let a = layout(ParticleType::Sweat, 0, 0, 25);
        let b = layout(ParticleType::Sweat, 0, 10, 25);
        let c = layout(ParticleType::Sweat, 0, 30, 25);
        assert_eq!(a.x, CENTER_X - 75 + 4);
        assert_eq!(b.y - a.y, 20);
        assert_eq!(c.y, a.y);
    }

    #[test]
    fn burst_ring_is_centred() {
        let first = layout(ParticleType::Burst, 0, 0, 25);
        // angle 0, dist 80 + sin(0) * 20
        assert_eq!(first.x, CENTER_X + 80);
        assert_eq!(first.y, CENTER_Y);
    }

    #[test]
    fn zzz_labels_fade_with_index() {
        let ops: std::vec::Vec<u8> = (0..3).map(|i| layout(ParticleType::Zzz, i, 0, 25).opacity).collect();
        assert_eq!(ops, vec![204, 184, 164]);
    }

    #[test]
    fn sparkle_rotates_three_degrees_per_frame() {
        assert_eq!(layout(ParticleType::Sparkle, 1, 0, 25).rotation_deg, 45.0);
        assert_eq!(layout(ParticleType::Sparkle, 1, 10, 25).rotation_deg, 75.0);
    }

    #[test]
    fn pool_sizes_fit() {
        for kind in [
            ParticleType::Float,
            ParticleType::Burst,
            ParticleType::Sweat,
            ParticleType::Sparkle,
            ParticleType::Spiral,
            ParticleType::Zzz,
        ] {
            assert!((2..=MAX_PARTICLES).contains(&kind.pool_size()));
        }
    }
}
