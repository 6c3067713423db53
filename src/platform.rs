// MiBuddy — Display & Audio Boundaries
//
// The avatar engine never talks to the panel or the codec directly. It drives
// these two traits; the firmware binds them to the LCD scene and the I2S audio
// task, the host simulator to an in-memory scene and an audio journal.

use std::sync::mpsc::Sender;

use embedded_graphics::pixelcolor::Rgb888;

use crate::error::{MochiError, Result};
use crate::mochi::theme::Palette;
use crate::mochi::types::FaceParams;

// ---------------------------------------------------------------------------
// Display primitive
// ---------------------------------------------------------------------------

/// Handle to a drawable object owned by a [`Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// What a particle object looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Dot,
    Ring,
    Drop,
    Star,
    Glyph(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Plain container used as a parent for the avatar.
    Container,
    Face,
    Particle(ParticleShape),
    Sprite,
    Background,
    Label,
}

/// Placement of an object. `x`/`y` address the object's centre in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: i32,
    pub y: i32,
    pub size: u32,
    pub rotation_deg: f32,
    pub opacity: u8,
    pub color: Rgb888,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            size: 0,
            rotation_deg: 0.0,
            opacity: 255,
            color: Rgb888::new(255, 255, 255),
        }
    }
}

/// Raw RGB565 little-endian image linked into the firmware.
#[derive(Debug, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub data: &'static [u8],
}

/// Image source handed to [`Display::bind_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Embedded(&'static EmbeddedImage),
    /// Path including the display filesystem drive prefix, e.g. `S:/sdcard/Images/bg.png`.
    Path(String),
}

pub trait Display {
    /// Create a visible object under `parent`.
    fn create(&mut self, parent: ObjectId, kind: ObjectKind) -> Result<ObjectId>;
    fn destroy(&mut self, obj: ObjectId);
    fn exists(&self, obj: ObjectId) -> bool;
    fn set_transform(&mut self, obj: ObjectId, transform: &Transform);
    fn set_visible(&mut self, obj: ObjectId, visible: bool);
    fn bind_image(&mut self, obj: ObjectId, source: ImageSource) -> Result<()>;
    fn set_text(&mut self, obj: ObjectId, text: &str);
    fn move_to_back(&mut self, obj: ObjectId);
    /// Replace the face drawing parameters of a [`ObjectKind::Face`] object.
    fn draw_face(&mut self, obj: ObjectId, face: &FaceParams, palette: &Palette);
    fn set_background_color(&mut self, color: Rgb888);
}

// ---------------------------------------------------------------------------
// Audio primitive
// ---------------------------------------------------------------------------

/// Fire-and-forget audio request; no completion is reported back.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    PlayPcm {
        pcm: &'static [i16],
        sample_rate: u32,
        channels: u8,
        looping: bool,
    },
    PlayFile {
        url: String,
        looping: bool,
    },
    Stop,
}

pub trait AudioOutput {
    fn play_pcm(&mut self, pcm: &'static [i16], sample_rate: u32, channels: u8, looping: bool) -> Result<()>;
    fn play_file(&mut self, url: &str, looping: bool) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Forwards every request to the audio task over a channel.
pub struct ChannelAudio {
    tx: Sender<AudioCommand>,
}

impl ChannelAudio {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, cmd: AudioCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| MochiError::Io("audio task channel closed".into()))
    }
}

impl AudioOutput for ChannelAudio {
    fn play_pcm(&mut self, pcm: &'static [i16], sample_rate: u32, channels: u8, looping: bool) -> Result<()> {
        self.send(AudioCommand::PlayPcm { pcm, sample_rate, channels, looping })
    }

    fn play_file(&mut self, url: &str, looping: bool) -> Result<()> {
        self.send(AudioCommand::PlayFile { url: url.to_string(), looping })
    }

    fn stop(&mut self) -> Result<()> {
        self.send(AudioCommand::Stop)
    }
}

/// Audio sink that only records what it was asked to play. Used by the host
/// simulator, which has no codec.
#[derive(Debug, Default)]
pub struct AudioJournal {
    commands: Vec<AudioCommand>,
}

impl AudioJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[AudioCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl AudioOutput for AudioJournal {
    fn play_pcm(&mut self, pcm: &'static [i16], sample_rate: u32, channels: u8, looping: bool) -> Result<()> {
        log::info!(
            target: "mochi_asset",
            "PCM {} samples @ {} Hz x{} (loop={})",
            pcm.len(),
            sample_rate,
            channels,
            looping
        );
        self.commands.push(AudioCommand::PlayPcm { pcm, sample_rate, channels, looping });
        Ok(())
    }

    fn play_file(&mut self, url: &str, looping: bool) -> Result<()> {
        log::info!(target: "mochi_asset", "File {} (loop={})", url, looping);
        self.commands.push(AudioCommand::PlayFile { url: url.to_string(), looping });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.commands.push(AudioCommand::Stop);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn channel_audio_forwards_commands() {
        let (tx, rx) = mpsc::channel();
        let mut audio = ChannelAudio::new(tx);
        audio.play_file("file://sdcard/Sounds/a.mp3", true).unwrap();
        audio.stop().unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            AudioCommand::PlayFile { url: "file://sdcard/Sounds/a.mp3".into(), looping: true }
        );
        assert_eq!(rx.try_recv().unwrap(), AudioCommand::Stop);
    }

    #[test]
    fn channel_audio_reports_closed_task() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut audio = ChannelAudio::new(tx);
        assert!(matches!(audio.stop(), Err(MochiError::Io(_))));
    }
}
