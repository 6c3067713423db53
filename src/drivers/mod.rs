pub mod audio;
pub mod http;
pub mod imu;
pub mod lcd;
pub mod pmu;
pub mod sdcard;
pub mod storage;
pub mod wifi;

use std::sync::Mutex;

use esp_idf_hal::i2c::I2cDriver;

/// Thread-safe handle to the shared I2C bus (IMU + PMU).
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;
