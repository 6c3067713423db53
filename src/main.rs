// MiBuddy — Firmware Entry Point
//
// Boot sequence:
//   1. Logger, NVS partition, system event loop.
//   2. Shared buses: I2C (IMU + PMU) and SPI2 (LCD + SD card).
//   3. SD card mount, persisted motion thresholds.
//   4. Optional WiFi; when it comes up, SNTP and the remote decision task.
//   5. Spawn power, audio and UI tasks.
//
// Built for the host, the same app runs headless against an in-memory scene
// and a scripted sensor ride, logging every mood change.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    simulator::run()
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{InputPin, OutputPin, PinDriver, Pull};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::i2s::I2sDriver;
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::spi::{config::DriverConfig, Dma, SpiDriver};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sntp::EspSntp;

    use mibuddy::config::*;
    use mibuddy::drivers::audio::CodecOutput;
    use mibuddy::drivers::imu::Qmi8658;
    use mibuddy::drivers::lcd::St7789;
    use mibuddy::drivers::storage::NvsStore;
    use mibuddy::drivers::{sdcard, wifi, SharedBus};
    use mibuddy::input::{remote, DefaultMapper, MotionConfig, MotionSettings};
    use mibuddy::mochi::Mochi;
    use mibuddy::platform::ChannelAudio;
    use mibuddy::scene::Scene;
    use mibuddy::tasks;
    use mibuddy::tasks::power::PowerShared;
    use mibuddy::tasks::sensor::BoardSensors;
    use mibuddy::MiBuddyApp;

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("MiBuddy firmware starting…");

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // ---- I2C bus (IMU + PMU) ----------------------------------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio7, // SDA
            peripherals.pins.gpio8, // SCL
            &i2c_config,
        )?;
        let i2c_bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

        // ---- SPI2 bus (LCD + SD card) -----------------------------------------
        let band_bytes = (DISPLAY_WIDTH * LCD_FLUSH_ROWS * 2) as usize;
        let spi = SpiDriver::new(
            peripherals.spi2,
            peripherals.pins.gpio1,        // SCLK
            peripherals.pins.gpio2,        // MOSI
            Some(peripherals.pins.gpio16), // MISO (SD only)
            &DriverConfig::new().dma(Dma::Auto(band_bytes)),
        )?;
        let spi_bus: sdcard::SharedSpi = Box::leak(Box::new(spi));

        if let Err(e) = sdcard::mount(spi_bus, peripherals.pins.gpio17.downgrade_output()) {
            log::warn!("SD card unavailable, running without sounds and images: {}", e);
        }

        // ---- Persisted motion thresholds --------------------------------------
        let motion = match NvsStore::open(nvs.clone()) {
            Ok(store) => *MotionSettings::load(store).config(),
            Err(e) => {
                log::error!("NVS open failed, using default thresholds: {}", e);
                MotionConfig::default()
            }
        };

        // ---- Network ------------------------------------------------------------
        let mut mapper = DefaultMapper::default();
        let mut _network = None;
        if let (Some(ssid), Some(password)) = (WIFI_SSID, WIFI_PASSWORD) {
            match wifi::connect(peripherals.modem, sysloop.clone(), nvs.clone(), ssid, password) {
                Ok(handle) => {
                    // Without SNTP the clock starts at the epoch and night mode is off.
                    let sntp = EspSntp::new_default()
                        .map_err(|e| log::warn!("SNTP start failed: {}", e))
                        .ok();
                    let (mailbox, worker) = remote::mailbox();
                    mapper = mapper.with_remote(mailbox);
                    thread::Builder::new()
                        .name("remote".into())
                        .stack_size(STACK_REMOTE)
                        .spawn(move || tasks::remote::remote_task(worker, REMOTE_DEFAULT_URL.to_string()))?;
                    _network = Some((handle, sntp));
                }
                Err(e) => log::warn!("WiFi connect failed, staying offline: {}", e),
            }
        } else {
            log::info!("No WiFi credentials built in, staying offline");
        }

        // ---- Power task -------------------------------------------------------
        let power = Arc::new(PowerShared::new());
        let pwr_shared = Arc::clone(&power);
        thread::Builder::new()
            .name("power".into())
            .stack_size(STACK_POWER)
            .spawn(move || tasks::power::power_task(i2c_bus, pwr_shared))?;

        // ---- Audio task -------------------------------------------------------
        let (audio_tx, audio_rx) = mpsc::channel();
        let i2s = I2sDriver::new_std_tx(
            peripherals.i2s0,
            &CodecOutput::config(),
            peripherals.pins.gpio20,       // BCLK
            peripherals.pins.gpio23,       // DOUT
            Some(peripherals.pins.gpio19), // MCLK
            peripherals.pins.gpio22,       // WS
        )?;
        let codec = CodecOutput::new(i2s)?;
        thread::Builder::new()
            .name("audio".into())
            .stack_size(STACK_AUDIO)
            .spawn(move || tasks::audio::audio_task(codec, audio_rx))?;

        // ---- UI task ----------------------------------------------------------
        let mut button = PinDriver::input(peripherals.pins.gpio9.downgrade_input())?;
        button.set_pull(Pull::Up)?;
        let backlight = PinDriver::output(peripherals.pins.gpio6.downgrade_output())?;

        thread::Builder::new()
            .name("ui".into())
            .stack_size(STACK_UI)
            .spawn(move || {
                // The panel handles are not Send; the LCD lives on this thread.
                let lcd = match St7789::new(backlight) {
                    Ok(lcd) => lcd,
                    Err(e) => {
                        log::error!("LCD init failed: {}", e);
                        return;
                    }
                };
                let mochi = Mochi::new(Scene::default(), ChannelAudio::new(audio_tx));
                let sensors = BoardSensors::new(Qmi8658::new(i2c_bus), power);
                let mut app = MiBuddyApp::new(mochi, sensors, mapper);
                app.set_motion_config(motion);
                tasks::ui::ui_task(app, button, lcd);
            })?;

        log::info!("Boot complete, entering normal operation");

        // Main thread keeps the network handles alive.
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}

// ---------------------------------------------------------------------------
// Host simulator
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
mod simulator {
    use std::cell::Cell;
    use std::rc::Rc;

    use mibuddy::config::*;
    use mibuddy::input::{DefaultMapper, SensorReadings};
    use mibuddy::mochi::Mochi;
    use mibuddy::platform::AudioJournal;
    use mibuddy::scene::{FrameBuffer, Scene};
    use mibuddy::MiBuddyApp;

    const STEP_MS: u32 = ANIM_PERIOD_MS;

    /// What the board feels at `t` ms into the ride.
    fn ride(t: u32) -> SensorReadings {
        let mut r = SensorReadings::resting();
        match t {
            // picked up and carried
            2_000..=3_999 => r.accel = [0.1, 0.2, 1.45],
            // shaken
            4_000..=4_999 => r.accel = [2.5, -1.0, 1.0],
            // set down hard, then held upright
            5_000..=5_199 => r.accel = [0.0, 0.0, 2.0],
            5_200..=7_999 => r.accel = [0.0, 1.0, 0.0],
            // tipped onto its left side
            8_000..=9_999 => r.accel = [-0.87, 0.5, 0.0],
            // spun on the desk
            10_000..=11_999 => r.gyro = [0.0, 0.0, 180.0],
            // late at night, battery running out
            12_000..=15_999 => {
                r.hour = 23;
                r.battery_pct = 15.0;
            }
            _ => {}
        }
        r
    }

    pub fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt::init();
        log::info!("MiBuddy simulator starting…");

        let clock = Rc::new(Cell::new(0u32));
        let sensor_clock = Rc::clone(&clock);
        let sensors = move || ride(sensor_clock.get());

        let mochi = Mochi::new(Scene::default(), AudioJournal::new());
        let mut app = MiBuddyApp::new(mochi, sensors, DefaultMapper::default());
        let root = app.mochi().display().root();
        app.run(root, 0)?;

        let mut frame = FrameBuffer::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        let mut label = app.label_text();
        let mut repaints = 0u32;
        while clock.get() < 16_000 {
            let now = clock.get();
            app.tick(now);
            if app.mochi_mut().display_mut().take_dirty() {
                if let Err(e) = app.mochi().display().render(&mut frame) {
                    match e {}
                }
                repaints += 1;
            }
            if app.label_text() != label {
                label = app.label_text();
                log::info!("{:>6} ms  {}", now, label);
            }
            clock.set(now + STEP_MS);
        }

        log::info!(
            "Ride over: {} repaints, {} audio commands",
            repaints,
            app.mochi().audio().commands().len()
        );
        for cmd in app.mochi().audio().commands() {
            log::info!("  audio: {:?}", cmd);
        }
        app.close();
        Ok(())
    }
}
