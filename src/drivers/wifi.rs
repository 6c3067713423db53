// MiBuddy — WiFi Station

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys as sys;

/// Join `ssid` and block until DHCP is done. The returned handle must be
/// kept alive for the connection to stay up.
pub fn connect(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    password: &str,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: password.try_into().map_err(|_| anyhow!("password too long"))?,
        auth_method: if password.is_empty() { AuthMethod::None } else { AuthMethod::WPA2Personal },
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    log::info!("WiFi connected to {}", ssid);
    Ok(wifi)
}

/// Whether the station is associated right now.
pub fn is_connected() -> bool {
    let mut info = sys::wifi_ap_record_t::default();
    unsafe { sys::esp_wifi_sta_get_ap_info(&mut info) == sys::ESP_OK }
}
