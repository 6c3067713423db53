// MiBuddy — AXP2101 Power Management Driver
//
// Battery percentage from the on-chip fuel gauge, charge and VBUS status.

use anyhow::anyhow;

use crate::config::*;
use crate::drivers::SharedBus;

const REG_STATUS1: u8 = 0x00;
const REG_STATUS2: u8 = 0x01;
const REG_ADC_ENABLE: u8 = 0x18;
const REG_BATTERY_PCT: u8 = 0xA4;

const GAUGE_ENABLE_BIT: u8 = 1 << 3;
const VBUS_GOOD_BIT: u8 = 1 << 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerStatus {
    pub battery_pct: f32,
    pub is_charging: bool,
    pub vbus_present: bool,
}

pub struct Axp2101 {
    bus: SharedBus,
}

impl Axp2101 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    fn read_reg(&self, reg: u8) -> anyhow::Result<u8> {
        let mut bus = self.bus.lock().map_err(|_| anyhow!("I2C bus poisoned"))?;
        let mut buf = [0u8; 1];
        bus.write_read(I2C_ADDR_AXP2101, &[reg], &mut buf, I2C_TIMEOUT_TICKS)?;
        Ok(buf[0])
    }

    /// Switch the fuel gauge on.
    pub fn init(&self) -> anyhow::Result<()> {
        let ctrl = self.read_reg(REG_ADC_ENABLE)?;
        let mut bus = self.bus.lock().map_err(|_| anyhow!("I2C bus poisoned"))?;
        bus.write(I2C_ADDR_AXP2101, &[REG_ADC_ENABLE, ctrl | GAUGE_ENABLE_BIT], I2C_TIMEOUT_TICKS)?;
        log::info!("AXP2101 fuel gauge enabled");
        Ok(())
    }

    pub fn status(&self) -> anyhow::Result<PowerStatus> {
        let status1 = self.read_reg(REG_STATUS1)?;
        let status2 = self.read_reg(REG_STATUS2)?;
        let pct = self.read_reg(REG_BATTERY_PCT)?.min(100);

        Ok(PowerStatus {
            battery_pct: pct as f32,
            // bits[6:5] = 01 → charging
            is_charging: (status2 >> 5) & 0b11 == 0b01,
            vbus_present: status1 & VBUS_GOOD_BIT != 0,
        })
    }
}
