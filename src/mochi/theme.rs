// MiBuddy — Theme Palettes
//
// One 11-colour palette per theme. Colours are stored as 24-bit values and
// converted to the panel's RGB565 at draw time.

use embedded_graphics::pixelcolor::Rgb888;

use super::types::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Rgb888,
    pub bg_light: Rgb888,
    pub face: Rgb888,
    pub face_highlight: Rgb888,
    pub face_shadow: Rgb888,
    pub eye: Rgb888,
    pub pupil: Rgb888,
    pub mouth: Rgb888,
    pub blush: Rgb888,
    pub accent: Rgb888,
    pub particle: Rgb888,
}

const WHITE: Rgb888 = Rgb888::new(255, 255, 255);

const SAKURA: Palette = Palette {
    bg: Rgb888::new(26, 22, 37),
    bg_light: Rgb888::new(45, 38, 64),
    face: Rgb888::new(255, 245, 245),
    face_highlight: WHITE,
    face_shadow: Rgb888::new(255, 228, 232),
    eye: Rgb888::new(45, 38, 64),
    pupil: Rgb888::new(255, 107, 157),
    mouth: Rgb888::new(255, 107, 157),
    blush: Rgb888::new(255, 179, 198),
    accent: Rgb888::new(255, 155, 193),
    particle: Rgb888::new(255, 209, 220),
};

const MINT: Palette = Palette {
    bg: Rgb888::new(15, 26, 26),
    bg_light: Rgb888::new(26, 47, 47),
    face: Rgb888::new(240, 255, 255),
    face_highlight: WHITE,
    face_shadow: Rgb888::new(212, 245, 245),
    eye: Rgb888::new(26, 47, 47),
    pupil: Rgb888::new(64, 201, 198),
    mouth: Rgb888::new(64, 201, 198),
    blush: Rgb888::new(168, 230, 207),
    accent: Rgb888::new(127, 219, 218),
    particle: Rgb888::new(200, 247, 247),
};

const LAVENDER: Palette = Palette {
    bg: Rgb888::new(26, 22, 37),
    bg_light: Rgb888::new(42, 32, 64),
    face: Rgb888::new(248, 245, 255),
    face_highlight: WHITE,
    face_shadow: Rgb888::new(232, 224, 240),
    eye: Rgb888::new(42, 32, 64),
    pupil: Rgb888::new(157, 124, 216),
    mouth: Rgb888::new(157, 124, 216),
    blush: Rgb888::new(219, 184, 255),
    accent: Rgb888::new(196, 167, 231),
    particle: Rgb888::new(232, 213, 255),
};

const PEACH: Palette = Palette {
    bg: Rgb888::new(31, 23, 20),
    bg_light: Rgb888::new(45, 36, 32),
    face: Rgb888::new(255, 248, 240),
    face_highlight: WHITE,
    face_shadow: Rgb888::new(255, 232, 214),
    eye: Rgb888::new(45, 36, 32),
    pupil: Rgb888::new(255, 140, 90),
    mouth: Rgb888::new(255, 140, 90),
    blush: Rgb888::new(255, 196, 168),
    accent: Rgb888::new(255, 176, 136),
    particle: Rgb888::new(255, 216, 200),
};

const CLOUD: Palette = Palette {
    bg: Rgb888::new(21, 24, 32),
    bg_light: Rgb888::new(32, 37, 53),
    face: Rgb888::new(245, 248, 255),
    face_highlight: WHITE,
    face_shadow: Rgb888::new(221, 229, 245),
    eye: Rgb888::new(32, 37, 53),
    pupil: Rgb888::new(85, 136, 204),
    mouth: Rgb888::new(85, 136, 204),
    blush: Rgb888::new(184, 208, 240),
    accent: Rgb888::new(136, 168, 216),
    particle: Rgb888::new(208, 224, 255),
};

/// Sweat drops keep a fixed sky blue regardless of theme.
pub const SWEAT_COLOR: Rgb888 = Rgb888::new(135, 206, 250);

impl Theme {
    pub fn palette(&self) -> &'static Palette {
        match self {
            Self::Sakura   => &SAKURA,
            Self::Mint     => &MINT,
            Self::Lavender => &LAVENDER,
            Self::Peach    => &PEACH,
            Self::Cloud    => &CLOUD,
        }
    }
}
