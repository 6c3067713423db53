// MiBuddy — Motion Thresholds
//
// Runtime-tunable thresholds for the motion-derived input flags. Values are
// persisted as fixed-point u32 (three decimals) through a ThresholdStore so
// the device keeps its tuning across reboots.

use std::collections::HashMap;

use log::{error, info};

use crate::config::*;
use crate::error::{MochiError, Result};

pub const KEY_MOVING: &str = "moving_g";
pub const KEY_SHAKING: &str = "shaking_g";
pub const KEY_ROTATING: &str = "rotating";
pub const KEY_SPINNING: &str = "spinning";
pub const KEY_BRAKING: &str = "braking";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Deviation from 1 g that counts as moving.
    pub moving_threshold_g: f32,
    pub shaking_threshold_g: f32,
    pub rotating_threshold_dps: f32,
    pub spinning_threshold_dps: f32,
    /// Drop in accel magnitude per second that counts as braking.
    pub braking_threshold_gps: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            moving_threshold_g: MOTION_DEFAULT_MOVING_G,
            shaking_threshold_g: MOTION_DEFAULT_SHAKING_G,
            rotating_threshold_dps: MOTION_DEFAULT_ROTATING_DPS,
            spinning_threshold_dps: MOTION_DEFAULT_SPINNING_DPS,
            braking_threshold_gps: MOTION_DEFAULT_BRAKING_GPS,
        }
    }
}

/// Durable u32 key/value storage, one namespace.
pub trait ThresholdStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>>;
    fn set_u32(&mut self, key: &str, value: u32) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

/// Volatile store for the host build and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, u32>,
    pub commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThresholdStore for MemoryStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.values.get(key).copied())
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}

fn to_fixed(value: f32) -> u32 {
    (value * NVS_FLOAT_SCALE) as u32
}

fn from_fixed(value: u32) -> f32 {
    value as f32 / NVS_FLOAT_SCALE
}

fn check(value: f32, what: &str) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MochiError::invalid_arg(format!("{} threshold must be positive, got {}", what, value)))
    }
}

/// Thresholds plus the store that backs them.
pub struct MotionSettings<S: ThresholdStore> {
    store: S,
    config: MotionConfig,
}

impl<S: ThresholdStore> MotionSettings<S> {
    /// Load from `store`, falling back to defaults for missing keys.
    pub fn load(store: S) -> Self {
        let mut config = MotionConfig::default();
        let slots: [(&str, &mut f32); 5] = [
            (KEY_MOVING, &mut config.moving_threshold_g),
            (KEY_SHAKING, &mut config.shaking_threshold_g),
            (KEY_ROTATING, &mut config.rotating_threshold_dps),
            (KEY_SPINNING, &mut config.spinning_threshold_dps),
            (KEY_BRAKING, &mut config.braking_threshold_gps),
        ];
        for (key, slot) in slots {
            match store.get_u32(key) {
                Ok(Some(raw)) => *slot = from_fixed(raw),
                Ok(None) => {}
                Err(e) => error!(target: "motion_cfg", "Failed to read {}: {}", key, e),
            }
        }
        info!(
            target: "motion_cfg",
            "Loaded config: moving={:.2}g, shaking={:.1}g, rotating={:.0}, spinning={:.0}, braking={:.1}g/s",
            config.moving_threshold_g,
            config.shaking_threshold_g,
            config.rotating_threshold_dps,
            config.spinning_threshold_dps,
            config.braking_threshold_gps
        );
        Self { store, config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn save(&mut self, key: &str, value: f32) -> Result<()> {
        let res = self.store.set_u32(key, to_fixed(value)).and_then(|_| self.store.commit());
        if let Err(e) = &res {
            error!(target: "motion_cfg", "Failed to save {}: {}", key, e);
        }
        res
    }

    pub fn set_moving_threshold(&mut self, g: f32) -> Result<()> {
        self.config.moving_threshold_g = check(g, "moving")?;
        self.save(KEY_MOVING, g)
    }

    pub fn set_shaking_threshold(&mut self, g: f32) -> Result<()> {
        self.config.shaking_threshold_g = check(g, "shaking")?;
        self.save(KEY_SHAKING, g)
    }

    pub fn set_rotating_threshold(&mut self, dps: f32) -> Result<()> {
        self.config.rotating_threshold_dps = check(dps, "rotating")?;
        self.save(KEY_ROTATING, dps)
    }

    pub fn set_spinning_threshold(&mut self, dps: f32) -> Result<()> {
        self.config.spinning_threshold_dps = check(dps, "spinning")?;
        self.save(KEY_SPINNING, dps)
    }

    pub fn set_braking_threshold(&mut self, gps: f32) -> Result<()> {
        self.config.braking_threshold_gps = check(gps, "braking")?;
        self.save(KEY_BRAKING, gps)
    }

    /// Restore every threshold to its default and persist all of them.
    pub fn reset_defaults(&mut self) -> Result<()> {
        self.config = MotionConfig::default();
        let c = self.config;
        for (key, value) in [
            (KEY_MOVING, c.moving_threshold_g),
            (KEY_SHAKING, c.shaking_threshold_g),
            (KEY_ROTATING, c.rotating_threshold_dps),
            (KEY_SPINNING, c.spinning_threshold_dps),
            (KEY_BRAKING, c.braking_threshold_gps),
        ] {
            self.store.set_u32(key, to_fixed(value))?;
        }
        self.store.commit()?;
        info!(target: "motion_cfg", "Reset to defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let settings = MotionSettings::load(MemoryStore::new());
        assert_eq!(*settings.config(), MotionConfig::default());
    }

    #[test]
    fn stored_values_are_fixed_point() {
        let mut store = MemoryStore::new();
        store.set_u32(KEY_SHAKING, 2500).unwrap();
        store.set_u32(KEY_ROTATING, 45_000).unwrap();
        let settings = MotionSettings::load(store);
        assert_eq!(settings.config().shaking_threshold_g, 2.5);
        assert_eq!(settings.config().rotating_threshold_dps, 45.0);
        assert_eq!(settings.config().moving_threshold_g, MOTION_DEFAULT_MOVING_G);
    }

    #[test]
    fn setters_persist_immediately() {
        let mut settings = MotionSettings::load(MemoryStore::new());
        settings.set_braking_threshold(4.25).unwrap();
        assert_eq!(settings.store().get_u32(KEY_BRAKING).unwrap(), Some(4250));
        assert_eq!(settings.store().commits, 1);

        assert!(settings.set_moving_threshold(-1.0).is_err());
        assert!(settings.set_spinning_threshold(f32::NAN).is_err());
        assert_eq!(settings.config().moving_threshold_g, MOTION_DEFAULT_MOVING_G);
    }

    #[test]
    fn reset_rewrites_every_key() {
        let mut settings = MotionSettings::load(MemoryStore::new());
        settings.set_shaking_threshold(3.0).unwrap();
        settings.reset_defaults().unwrap();
        assert_eq!(settings.config().shaking_threshold_g, MOTION_DEFAULT_SHAKING_G);
        for key in [KEY_MOVING, KEY_SHAKING, KEY_ROTATING, KEY_SPINNING, KEY_BRAKING] {
            assert!(settings.store().get_u32(key).unwrap().is_some(), "{key}");
        }
    }
}
