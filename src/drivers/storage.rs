// MiBuddy — NVS Threshold Store

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use crate::config::NVS_NAMESPACE;
use crate::error::{MochiError, Result};
use crate::input::ThresholdStore;

pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    pub fn open(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs })
    }
}

impl ThresholdStore for NvsStore {
    fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.nvs
            .get_u32(key)
            .map_err(|e| MochiError::Io(format!("nvs get {}: {}", key, e)))
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<()> {
        self.nvs
            .set_u32(key, value)
            .map_err(|e| MochiError::Io(format!("nvs set {}: {}", key, e)))
    }

    // EspNvs commits inside every set
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}
