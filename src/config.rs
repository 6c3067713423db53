// MiBuddy — Hardware & System Configuration
// Target: Waveshare ESP32-C6-Touch-LCD-1.83 (RISC-V)

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_BOOT_BUTTON: i32 = 9;   // BOOT key (INPUT_PULLUP, active LOW)
pub const PIN_I2C_SDA: i32 = 7;       // Touch / IMU / PMU / RTC bus
pub const PIN_I2C_SCL: i32 = 8;
pub const PIN_LCD_SCLK: i32 = 1;
pub const PIN_LCD_MOSI: i32 = 2;
pub const PIN_LCD_CS: i32 = 5;
pub const PIN_LCD_DC: i32 = 3;
pub const PIN_LCD_RST: i32 = 4;
pub const PIN_LCD_BL: i32 = 6;
pub const PIN_SD_MISO: i32 = 16;      // SD shares SCLK/MOSI with the LCD on SPI2
pub const PIN_SD_CS: i32 = 17;
pub const PIN_I2S_MCLK: i32 = 19;
pub const PIN_I2S_BCLK: i32 = 20;
pub const PIN_I2S_WS: i32 = 22;
pub const PIN_I2S_DOUT: i32 = 23;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_QMI8658: u8 = 0x6B;
pub const I2C_ADDR_AXP2101: u8 = 0x34;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks
pub const I2C_BAUDRATE_KHZ: u32 = 400;

// QMI8658 sensitivity (CTRL2 = ±8 g, CTRL3 = ±512 °/s)
pub const ACCEL_SCALE_8G: f32 = 4096.0;   // LSB/g
pub const GYRO_SCALE_512: f32 = 64.0;     // LSB/°/s

// ---------------------------------------------------------------------------
// Display (ST7789P, portrait)
// ---------------------------------------------------------------------------
pub const DISPLAY_WIDTH: u32 = 240;
pub const DISPLAY_HEIGHT: u32 = 284;
pub const CENTER_X: i32 = (DISPLAY_WIDTH / 2) as i32;
pub const CENTER_Y: i32 = (DISPLAY_HEIGHT / 2) as i32;
pub const LCD_PCLK_HZ: u32 = 40_000_000;
pub const LCD_Y_GAP: i32 = 20;          // panel RAM is 240x320, visible rows start at 20
pub const LCD_FLUSH_ROWS: u32 = 16;

/// Face canvas edge; every face dimension is expressed against a 200 px design.
pub const FACE_CANVAS_SIZE: i32 = 120;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_UI: usize = 16384;
pub const STACK_AUDIO: usize = 8192;
pub const STACK_REMOTE: usize = 8192;
pub const STACK_POWER: usize = 4096;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const ANIM_PERIOD_MS: u32 = 25;                    // 40 FPS
pub const PARTICLE_PERIOD_MS: u32 = ANIM_PERIOD_MS;    // shares the animation cadence
pub const BLINK_INTERVAL_MS: u32 = 3000;
pub const BLINK_RATE_PER_SEC: f32 = 6.0;               // 0.15 per 25 ms frame
pub const INPUT_INTERVAL_DEFAULT_MS: u32 = 200;
pub const INPUT_INTERVAL_MIN_MS: u32 = 50;
pub const INPUT_INTERVAL_MAX_MS: u32 = 5000;
pub const UI_POLL_INTERVAL_MS: u64 = 5;
pub const DEBOUNCE_MS: u64 = 50;
pub const LONG_PRESS_MS: u64 = 1500;
pub const DOUBLE_CLICK_WINDOW_MS: u64 = 400;
pub const REMOTE_POLL_MS: u64 = 500;
pub const REMOTE_TIMEOUT_MS: u64 = 5000;
pub const BATTERY_CHECK_INTERVAL_MS: u64 = 5000;

// ---------------------------------------------------------------------------
// Avatar defaults
// ---------------------------------------------------------------------------
pub const INTENSITY_MIN: f32 = 0.2;
pub const INTENSITY_MAX: f32 = 1.0;
pub const INTENSITY_DEFAULT: f32 = 0.7;
pub const INTENSITY_STEPS: [f32; 4] = [0.4, 0.7, 1.0, 0.2];

// ---------------------------------------------------------------------------
// Input classification thresholds (fixed)
// ---------------------------------------------------------------------------
pub const LOW_BATTERY_PCT: f32 = 20.0;
pub const CRITICAL_BATTERY_PCT: f32 = 5.0;
pub const NIGHT_START_HOUR: u8 = 22;
pub const NIGHT_END_HOUR: u8 = 6;
pub const ORIENTATION_THRESHOLD_G: f32 = 0.7;
pub const STANDARD_GRAVITY: f32 = 9.807;

// Motion threshold defaults (runtime-configurable, persisted)
pub const MOTION_DEFAULT_MOVING_G: f32 = 0.3;
pub const MOTION_DEFAULT_SHAKING_G: f32 = 2.0;
pub const MOTION_DEFAULT_ROTATING_DPS: f32 = 30.0;
pub const MOTION_DEFAULT_SPINNING_DPS: f32 = 100.0;
pub const MOTION_DEFAULT_BRAKING_GPS: f32 = 3.0;

// Tilt zones used by the default mapper
pub const TILT_ROLL_BASELINE_DEG: f32 = 90.0;
pub const TILT_PITCH_BASELINE_DEG: f32 = 0.0;
pub const TILT_THRESHOLD_DEG: f32 = 25.0;
pub const TILT_EXTREME_THRESHOLD_DEG: f32 = 35.0;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------
pub const SD_MOUNT_POINT: &str = "/sdcard";
pub const SD_MAX_FILES: usize = 5;
pub const SD_SOUNDS_PATH: &str = "/sdcard/Sounds/";
pub const SD_IMAGES_PATH: &str = "/sdcard/Images/";
pub const AUDIO_URL_PREFIX: &str = "file:/";
pub const DISPLAY_FS_PREFIX: &str = "S:";
pub const CODEC_SAMPLE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// Remote decision service
// ---------------------------------------------------------------------------
pub const REMOTE_DEFAULT_URL: &str = "http://10.0.13.101:8080/mochi/state";
pub const REMOTE_RESPONSE_MAX: usize = 512;

// Station credentials are baked in at build time; without them the device
// stays offline and only the on-board mapper runs.
pub const WIFI_SSID: Option<&str> = option_env!("MIBUDDY_WIFI_SSID");
pub const WIFI_PASSWORD: Option<&str> = option_env!("MIBUDDY_WIFI_PASSWORD");

// ---------------------------------------------------------------------------
// Motion threshold persistence
// ---------------------------------------------------------------------------
pub const NVS_NAMESPACE: &str = "motion_cfg";
pub const NVS_FLOAT_SCALE: f32 = 1000.0;
