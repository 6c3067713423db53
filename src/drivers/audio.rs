// MiBuddy — I2S Codec Output
//
// Philips I2S at the codec rate, 16-bit stereo slots. Mono samples are
// duplicated onto both slots.

use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::i2s::config::{DataBitWidth, StdConfig};
use esp_idf_hal::i2s::{I2sDriver, I2sTx};

use crate::config::*;

const WRITE_CHUNK: usize = 256;

pub struct CodecOutput {
    i2s: I2sDriver<'static, I2sTx>,
    bytes: Vec<u8>,
}

impl CodecOutput {
    pub fn new(mut i2s: I2sDriver<'static, I2sTx>) -> anyhow::Result<Self> {
        i2s.tx_enable()?;
        log::info!("I2S output enabled at {} Hz", CODEC_SAMPLE_RATE);
        Ok(Self { i2s, bytes: Vec::with_capacity(WRITE_CHUNK * 4) })
    }

    /// Stream configuration matching [`CodecOutput`].
    pub fn config() -> StdConfig {
        StdConfig::philips(CODEC_SAMPLE_RATE, DataBitWidth::Bits16)
    }

    /// Blocking write of codec-rate mono samples.
    pub fn write(&mut self, samples: &[i16]) -> anyhow::Result<()> {
        for chunk in samples.chunks(WRITE_CHUNK) {
            self.bytes.clear();
            for s in chunk {
                let le = s.to_le_bytes();
                self.bytes.extend_from_slice(&le);
                self.bytes.extend_from_slice(&le);
            }
            self.i2s.write_all(&self.bytes, BLOCK)?;
        }
        Ok(())
    }
}
