// MiBuddy — SD Card Mount
//
// FAT filesystem on the SD card, mounted at SD_MOUNT_POINT so sound and
// image assets are plain file paths.

use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin};
use esp_idf_hal::spi::SpiDriver;
use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::sd::spi::SdSpiHostDriver;
use esp_idf_svc::sd::{SdCardConfiguration, SdCardDriver};

use crate::config::*;

/// SPI2, shared by the LCD and the SD card. Lives for the whole programme.
pub type SharedSpi = &'static SpiDriver<'static>;

/// Mount the card. The mount stays up until reset.
pub fn mount(spi: SharedSpi, cs: AnyOutputPin) -> anyhow::Result<()> {
    let host = SdSpiHostDriver::new(
        spi,
        Some(cs),
        AnyInputPin::none(),
        AnyInputPin::none(),
        AnyIOPin::none(),
        None,
    )?;
    let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())?;
    let mounted = MountedFatfs::mount(Fatfs::new_sdcard(0, card)?, SD_MOUNT_POINT, SD_MAX_FILES)?;

    // never unmounted
    Box::leak(Box::new(mounted));
    log::info!("SD card mounted at {}", SD_MOUNT_POINT);
    Ok(())
}
