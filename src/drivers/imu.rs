// MiBuddy — QMI8658 IMU Driver
//
// Register-level driver over the shared I2C bus. Accelerometer at ±8 g,
// gyroscope at ±512 °/s, both sampled continuously.

use anyhow::anyhow;

use crate::config::*;
use crate::drivers::SharedBus;

// QMI8658 register addresses
const REG_WHO_AM_I: u8 = 0x00;
const REG_CTRL1: u8 = 0x02;
const REG_CTRL2: u8 = 0x03;
const REG_CTRL3: u8 = 0x04;
const REG_CTRL7: u8 = 0x08;
const REG_TEMP_L: u8 = 0x33;
const REG_AX_L: u8 = 0x35; // Start of 12-byte accel+gyro burst
const WHO_AM_I_EXPECTED: u8 = 0x05;

/// One accel + gyro sample in physical units.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImuSample {
    pub accel: [f32; 3], // g
    pub gyro: [f32; 3],  // °/s
}

pub struct Qmi8658 {
    bus: SharedBus,
}

impl Qmi8658 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let Ok(mut bus) = self.bus.lock() else {
            return false;
        };
        let mut buf = [0u8; 1];
        match bus.write_read(I2C_ADDR_QMI8658, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Enable register auto-increment and both sensors.
    pub fn init(&self) -> anyhow::Result<()> {
        let mut bus = self.bus.lock().map_err(|_| anyhow!("I2C bus poisoned"))?;

        // Address auto-increment, little-endian data
        bus.write(I2C_ADDR_QMI8658, &[REG_CTRL1, 0x40], I2C_TIMEOUT_TICKS)?;

        // Accelerometer: ±8 g, 250 Hz
        bus.write(I2C_ADDR_QMI8658, &[REG_CTRL2, 0x25], I2C_TIMEOUT_TICKS)?;

        // Gyroscope: ±512 °/s, 250 Hz
        bus.write(I2C_ADDR_QMI8658, &[REG_CTRL3, 0x55], I2C_TIMEOUT_TICKS)?;

        // Enable accel + gyro
        bus.write(I2C_ADDR_QMI8658, &[REG_CTRL7, 0x03], I2C_TIMEOUT_TICKS)?;

        log::info!("QMI8658 initialised (±8g, ±512°/s)");
        Ok(())
    }

    /// Burst-read all 6 axes and convert to physical units.
    pub fn read(&self) -> anyhow::Result<ImuSample> {
        let mut bus = self.bus.lock().map_err(|_| anyhow!("I2C bus poisoned"))?;
        let mut raw = [0u8; 12];
        bus.write_read(I2C_ADDR_QMI8658, &[REG_AX_L], &mut raw, I2C_TIMEOUT_TICKS)?;

        let axis = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]) as f32;
        Ok(ImuSample {
            accel: [axis(0) / ACCEL_SCALE_8G, axis(2) / ACCEL_SCALE_8G, axis(4) / ACCEL_SCALE_8G],
            gyro: [axis(6) / GYRO_SCALE_512, axis(8) / GYRO_SCALE_512, axis(10) / GYRO_SCALE_512],
        })
    }

    /// Die temperature in °C.
    pub fn temperature(&self) -> anyhow::Result<f32> {
        let mut bus = self.bus.lock().map_err(|_| anyhow!("I2C bus poisoned"))?;
        let mut raw = [0u8; 2];
        bus.write_read(I2C_ADDR_QMI8658, &[REG_TEMP_L], &mut raw, I2C_TIMEOUT_TICKS)?;
        Ok(i16::from_le_bytes(raw) as f32 / 256.0)
    }
}
