// MiBuddy — Sound Pipeline
//
// Board-independent half of audio playback: decode SD sound files and bring
// any PCM clip to the codec's mono 16 kHz stream. The I2S driver only ever
// sees codec-rate i16 samples.

use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::{AUDIO_URL_PREFIX, CODEC_SAMPLE_RATE};
use crate::error::{MochiError, Result};

const RESAMPLE_CHUNK: usize = 256;

/// Filesystem path behind an audio URL (`file://sdcard/x.mp3` → `/sdcard/x.mp3`).
pub fn url_to_path(url: &str) -> &str {
    url.strip_prefix(AUDIO_URL_PREFIX).unwrap_or(url)
}

/// Average interleaved channels into normalised mono.
pub fn downmix_mono(interleaved: &[i16], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().map(|&s| s as f32).sum::<f32>() / (frame.len() as f32 * 32768.0))
        .collect()
}

fn to_i16(x: f32) -> i16 {
    (x.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Streaming mono resampler to the codec rate. Passes through when the
/// source already runs at that rate.
pub struct Resampler {
    inner: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
}

impl Resampler {
    pub fn new(from_rate: u32) -> Result<Self> {
        if from_rate == 0 {
            return Err(MochiError::invalid_arg("sample rate 0"));
        }
        let inner = if from_rate == CODEC_SAMPLE_RATE {
            None
        } else {
            let ratio = CODEC_SAMPLE_RATE as f64 / from_rate as f64;
            let r = FastFixedIn::new(ratio, 2.0, PolynomialDegree::Linear, RESAMPLE_CHUNK, 1)
                .map_err(|e| MochiError::Io(format!("resampler: {}", e)))?;
            Some(r)
        };
        Ok(Self { inner, pending: Vec::new() })
    }

    /// Feed mono samples; whole chunks are converted and appended to `out`.
    pub fn push(&mut self, mono: &[f32], out: &mut Vec<i16>) -> Result<()> {
        let Some(r) = self.inner.as_mut() else {
            out.extend(mono.iter().map(|&x| to_i16(x)));
            return Ok(());
        };
        self.pending.extend_from_slice(mono);
        loop {
            let need = r.input_frames_next();
            if self.pending.len() < need {
                return Ok(());
            }
            let chunk: Vec<f32> = self.pending.drain(..need).collect();
            let converted = r
                .process(&[chunk], None)
                .map_err(|e| MochiError::Io(format!("resample: {}", e)))?;
            out.extend(converted[0].iter().map(|&x| to_i16(x)));
        }
    }

    /// Convert whatever is still buffered.
    pub fn flush(&mut self, out: &mut Vec<i16>) -> Result<()> {
        let Some(r) = self.inner.as_mut() else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }
        let rest = [std::mem::take(&mut self.pending)];
        let converted = r
            .process_partial(Some(&rest[..]), None)
            .map_err(|e| MochiError::Io(format!("resample: {}", e)))?;
        out.extend(converted[0].iter().map(|&x| to_i16(x)));
        Ok(())
    }
}

/// Convert a whole in-memory clip to codec-rate mono.
pub fn to_codec_rate(pcm: &[i16], sample_rate: u32, channels: u8) -> Result<Vec<i16>> {
    let mut r = Resampler::new(sample_rate)?;
    let mut out = Vec::with_capacity(pcm.len() * CODEC_SAMPLE_RATE as usize / sample_rate.max(1) as usize + 16);
    r.push(&downmix_mono(pcm, channels as usize), &mut out)?;
    r.flush(&mut out)?;
    Ok(out)
}

/// Decode `path` packet by packet. `sink` receives interleaved samples, the
/// source rate and channel count; returning `false` stops decoding early.
pub fn decode_file<F>(path: &str, mut sink: F) -> Result<()>
where
    F: FnMut(&[i16], u32, usize) -> Result<bool>,
{
    let file = File::open(path).map_err(|e| MochiError::Io(format!("{}: {}", path, e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MochiError::Io(format!("probe {}: {}", path, e)))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MochiError::Io(format!("{}: no audio track", path)))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MochiError::Io(format!("decoder {}: {}", path, e)))?;

    let mut buf: Option<SampleBuffer<i16>> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(MochiError::Io(format!("read {}: {}", path, e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                // corrupt frame; skip it
                warn!(target: "mochi_asset", "{}: {}", path, e);
                continue;
            }
            Err(e) => return Err(MochiError::Io(format!("decode {}: {}", path, e))),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;
        let samples = buf.get_or_insert_with(|| SampleBuffer::new(frames, spec));
        if samples.capacity() < decoded.capacity() * spec.channels.count() {
            *samples = SampleBuffer::new(frames, spec);
        }
        samples.copy_interleaved_ref(decoded);
        if !sink(samples.samples(), spec.rate, spec.channels.count())? {
            debug!(target: "mochi_asset", "{}: stopped early", path);
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_prefix_is_stripped() {
        assert_eq!(url_to_path("file://sdcard/Sounds/weee.mp3"), "/sdcard/Sounds/weee.mp3");
        assert_eq!(url_to_path("/already/a/path.wav"), "/already/a/path.wav");
    }

    #[test]
    fn stereo_downmix_averages() {
        let mono = downmix_mono(&[16384, 0, -16384, -16384], 2);
        assert_eq!(mono, vec![0.25, -0.5]);
    }

    #[test]
    fn codec_rate_passes_through() {
        let pcm = [0i16, 1000, -1000, 32767];
        let out = to_codec_rate(&pcm, CODEC_SAMPLE_RATE, 1).unwrap();
        assert_eq!(out.len(), 4);
        assert!((out[1] - 1000).abs() <= 1);
    }

    #[test]
    fn upsampling_doubles_length() {
        let pcm = vec![0i16; 1024];
        let out = to_codec_rate(&pcm, CODEC_SAMPLE_RATE / 2, 1).unwrap();
        assert!((1900..=2200).contains(&out.len()), "got {}", out.len());
        assert!(Resampler::new(0).is_err());
    }

    #[test]
    fn wav_files_decode() {
        let path = std::env::temp_dir().join(format!("mibuddy-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..800 {
            w.write_sample(((i % 40) * 100) as i16).unwrap();
        }
        w.finalize().unwrap();

        let mut total = 0;
        let path_str = path.to_str().unwrap().to_string();
        decode_file(&path_str, |samples, rate, channels| {
            assert_eq!((rate, channels), (8000, 1));
            total += samples.len();
            Ok(true)
        })
        .unwrap();
        assert_eq!(total, 800);
        let _ = std::fs::remove_file(&path);

        assert!(decode_file("/no/such/file.mp3", |_, _, _| Ok(true)).is_err());
    }
}
