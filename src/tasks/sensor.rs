// MiBuddy — Board Sensor Source
//
// Assembles one SensorReadings snapshot per input tick: IMU burst read,
// PMU values cached by the power task, local time and WiFi association.

use std::sync::Arc;

use esp_idf_sys as sys;

use crate::drivers::imu::Qmi8658;
use crate::drivers::wifi;
use crate::input::{SensorReadings, SensorSource};
use crate::tasks::power::PowerShared;

pub struct BoardSensors {
    imu: Qmi8658,
    imu_ok: bool,
    power: Arc<PowerShared>,
    last: SensorReadings,
}

impl BoardSensors {
    pub fn new(imu: Qmi8658, power: Arc<PowerShared>) -> Self {
        let imu_ok = match imu.init() {
            Ok(()) => true,
            Err(e) => {
                log::error!("QMI8658 init failed: {}", e);
                false
            }
        };
        Self { imu, imu_ok, power, last: SensorReadings::resting() }
    }
}

/// Local wall-clock time as (hour, minute, day of week with Sunday = 0).
fn local_time() -> (u8, u8, u8) {
    let mut now: sys::time_t = 0;
    let mut tm = sys::tm::default();
    unsafe {
        sys::time(&mut now);
        sys::localtime_r(&now, &mut tm);
    }
    (tm.tm_hour as u8, tm.tm_min as u8, tm.tm_wday as u8)
}

impl SensorSource for BoardSensors {
    fn read(&mut self) -> SensorReadings {
        let mut r = self.last;

        if self.imu_ok {
            match self.imu.read() {
                Ok(sample) => {
                    r.accel = sample.accel;
                    r.gyro = sample.gyro;
                }
                // keep the previous motion values for one tick
                Err(e) => log::warn!("IMU read error: {}", e),
            }
            if let Ok(t) = self.imu.temperature() {
                r.temperature = t;
            }
        }

        r.battery_pct = self.power.battery_pct();
        r.is_charging = self.power.is_charging();
        (r.hour, r.minute, r.day_of_week) = local_time();
        r.wifi_connected = wifi::is_connected();
        r.touch_active = false;

        self.last = r;
        r
    }
}
