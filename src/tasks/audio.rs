// MiBuddy — Audio Task
//
// Plays AudioCommands on the codec one at a time. A new command interrupts
// whatever is playing; looping clips repeat until then.

use std::sync::mpsc::{Receiver, TryRecvError};

use crate::drivers::audio::CodecOutput;
use crate::error::MochiError;
use crate::platform::AudioCommand;
use crate::sound::{self, Resampler};

enum Playback {
    Finished,
    Interrupted(AudioCommand),
    Failed,
}

/// Non-blocking look at the queue. A closed queue counts as a Stop.
fn interruption(rx: &Receiver<AudioCommand>) -> Option<AudioCommand> {
    match rx.try_recv() {
        Ok(cmd) => Some(cmd),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(AudioCommand::Stop),
    }
}

fn play_clip(codec: &mut CodecOutput, clip: &[i16], rx: &Receiver<AudioCommand>) -> Playback {
    for chunk in clip.chunks(1024) {
        if let Some(cmd) = interruption(rx) {
            return Playback::Interrupted(cmd);
        }
        if let Err(e) = codec.write(chunk) {
            log::error!("I2S write failed: {}", e);
            return Playback::Failed;
        }
    }
    Playback::Finished
}

fn play_file(codec: &mut CodecOutput, path: &str, rx: &Receiver<AudioCommand>) -> Playback {
    let mut resampler: Option<Resampler> = None;
    let mut out = Vec::new();
    let mut interrupted = None;

    let result = sound::decode_file(path, |samples, rate, channels| {
        if let Some(cmd) = interruption(rx) {
            interrupted = Some(cmd);
            return Ok(false);
        }
        if resampler.is_none() {
            resampler = Some(Resampler::new(rate)?);
        }
        let Some(r) = resampler.as_mut() else {
            return Ok(false);
        };
        out.clear();
        r.push(&sound::downmix_mono(samples, channels), &mut out)?;
        codec.write(&out).map_err(|e| MochiError::Io(format!("i2s: {}", e)))?;
        Ok(true)
    });

    if let Some(cmd) = interrupted {
        return Playback::Interrupted(cmd);
    }
    if let Err(e) = result {
        log::error!("Playback of {} failed: {}", path, e);
        return Playback::Failed;
    }
    if let Some(r) = resampler.as_mut() {
        out.clear();
        if r.flush(&mut out).is_ok() && !out.is_empty() {
            if let Err(e) = codec.write(&out) {
                log::error!("I2S write failed: {}", e);
            }
        }
    }
    Playback::Finished
}

pub fn audio_task(mut codec: CodecOutput, rx: Receiver<AudioCommand>) {
    log::info!("Audio task started");

    let mut next: Option<AudioCommand> = None;
    loop {
        let cmd = match next.take() {
            Some(cmd) => cmd,
            None => match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => {
                    log::warn!("Audio channel closed, exiting audio task");
                    return;
                }
            },
        };

        match cmd {
            AudioCommand::Stop => {}
            AudioCommand::PlayPcm { pcm, sample_rate, channels, looping } => {
                let clip = match sound::to_codec_rate(pcm, sample_rate, channels) {
                    Ok(clip) => clip,
                    Err(e) => {
                        log::error!("PCM conversion failed: {}", e);
                        continue;
                    }
                };
                loop {
                    match play_clip(&mut codec, &clip, &rx) {
                        Playback::Finished if looping => continue,
                        Playback::Interrupted(cmd) => next = Some(cmd),
                        _ => {}
                    }
                    break;
                }
            }
            AudioCommand::PlayFile { url, looping } => {
                let path = sound::url_to_path(&url);
                loop {
                    match play_file(&mut codec, path, &rx) {
                        Playback::Finished if looping => continue,
                        Playback::Interrupted(cmd) => next = Some(cmd),
                        _ => {}
                    }
                    break;
                }
            }
        }
    }
}
