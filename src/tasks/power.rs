// MiBuddy — Power Monitoring Task
//
// Periodically reads the AXP2101 and publishes battery level and charge
// state for the input pipeline. The UI task never touches the PMU itself.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::*;
use crate::drivers::pmu::Axp2101;
use crate::drivers::SharedBus;

/// Latest PMU reading, shared lock-free with the UI task.
pub struct PowerShared {
    battery_bits: AtomicU32,
    charging: AtomicBool,
}

impl PowerShared {
    pub fn new() -> Self {
        Self {
            battery_bits: AtomicU32::new(100f32.to_bits()),
            charging: AtomicBool::new(false),
        }
    }

    pub fn battery_pct(&self) -> f32 {
        f32::from_bits(self.battery_bits.load(Ordering::Relaxed))
    }

    pub fn is_charging(&self) -> bool {
        self.charging.load(Ordering::Relaxed)
    }
}

impl Default for PowerShared {
    fn default() -> Self {
        Self::new()
    }
}

pub fn power_task(bus: SharedBus, shared: Arc<PowerShared>) {
    log::info!("Power task started");

    let pmu = Axp2101::new(bus);
    if let Err(e) = pmu.init() {
        log::error!("AXP2101 init failed: {}", e);
        return;
    }

    let check_interval = Duration::from_millis(BATTERY_CHECK_INTERVAL_MS);
    loop {
        match pmu.status() {
            Ok(status) => {
                shared.battery_bits.store(status.battery_pct.to_bits(), Ordering::Relaxed);
                shared.charging.store(status.is_charging, Ordering::Relaxed);
                log::debug!(
                    "Battery {:.0}% charging={} vbus={}",
                    status.battery_pct,
                    status.is_charging,
                    status.vbus_present
                );
            }
            Err(e) => log::warn!("PMU read error: {}", e),
        }
        thread::sleep(check_interval);
    }
}
