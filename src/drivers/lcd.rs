// MiBuddy — ST7789 LCD Driver
//
// SPI panel through the ESP-IDF esp_lcd component. The scene is rasterised
// into a host-side frame buffer and pushed to the panel in bands of
// LCD_FLUSH_ROWS rows. The SPI2 bus itself belongs to the shared SpiDriver.

use core::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_sys::{self as sys, esp};

use crate::config::*;
use crate::scene::FrameBuffer;

/// Set by the SPI driver when the last colour transfer left the band buffer.
static TRANS_DONE: AtomicBool = AtomicBool::new(true);

unsafe extern "C" fn on_color_trans_done(
    _io: sys::esp_lcd_panel_io_handle_t,
    _edata: *mut sys::esp_lcd_panel_io_event_data_t,
    _ctx: *mut c_void,
) -> bool {
    TRANS_DONE.store(true, Ordering::Release);
    false
}

pub struct St7789 {
    io: sys::esp_lcd_panel_io_handle_t,
    panel: sys::esp_lcd_panel_handle_t,
    band: Vec<u8>,
    row: Vec<u8>,
    _backlight: PinDriver<'static, AnyOutputPin, Output>,
}

impl St7789 {
    /// Attach the panel to the already initialised SPI2 bus and light the backlight.
    pub fn new(mut backlight: PinDriver<'static, AnyOutputPin, Output>) -> anyhow::Result<Self> {
        let band_bytes = (DISPLAY_WIDTH * LCD_FLUSH_ROWS * 2) as usize;
        let host = sys::spi_host_device_t_SPI2_HOST;

        let io_cfg = sys::esp_lcd_panel_io_spi_config_t {
            cs_gpio_num: PIN_LCD_CS,
            dc_gpio_num: PIN_LCD_DC,
            spi_mode: 0,
            pclk_hz: LCD_PCLK_HZ,
            trans_queue_depth: 10,
            on_color_trans_done: Some(on_color_trans_done),
            user_ctx: core::ptr::null_mut(),
            lcd_cmd_bits: 8,
            lcd_param_bits: 8,
            ..Default::default()
        };
        let mut io: sys::esp_lcd_panel_io_handle_t = core::ptr::null_mut();
        esp!(unsafe { sys::esp_lcd_new_panel_io_spi(host as sys::esp_lcd_spi_bus_handle_t, &io_cfg, &mut io) })?;

        let mut panel_cfg = sys::esp_lcd_panel_dev_config_t::default();
        panel_cfg.reset_gpio_num = PIN_LCD_RST;
        panel_cfg.__bindgen_anon_1.rgb_ele_order = sys::lcd_rgb_element_order_t_LCD_RGB_ELEMENT_ORDER_RGB;
        panel_cfg.bits_per_pixel = 16;

        let mut panel: sys::esp_lcd_panel_handle_t = core::ptr::null_mut();
        esp!(unsafe { sys::esp_lcd_new_panel_st7789(io, &panel_cfg, &mut panel) })?;

        unsafe {
            esp!(sys::esp_lcd_panel_reset(panel))?;
            esp!(sys::esp_lcd_panel_init(panel))?;
            esp!(sys::esp_lcd_panel_invert_color(panel, true))?;
            esp!(sys::esp_lcd_panel_set_gap(panel, 0, LCD_Y_GAP))?;
            esp!(sys::esp_lcd_panel_disp_on_off(panel, true))?;
        }
        backlight.set_high()?;

        log::info!("ST7789 ready ({}x{})", DISPLAY_WIDTH, DISPLAY_HEIGHT);
        Ok(Self {
            io,
            panel,
            band: Vec::with_capacity(band_bytes),
            row: Vec::with_capacity((DISPLAY_WIDTH * 2) as usize),
            _backlight: backlight,
        })
    }

    /// Push the whole frame buffer to the panel.
    pub fn flush(&mut self, fb: &FrameBuffer) -> anyhow::Result<()> {
        let mut y = 0;
        while y < DISPLAY_HEIGHT {
            let rows = LCD_FLUSH_ROWS.min(DISPLAY_HEIGHT - y);
            self.wait_idle();

            self.band.clear();
            for r in y..y + rows {
                fb.row_be_bytes(r, &mut self.row);
                self.band.extend_from_slice(&self.row);
            }

            TRANS_DONE.store(false, Ordering::Release);
            esp!(unsafe {
                sys::esp_lcd_panel_draw_bitmap(
                    self.panel,
                    0,
                    y as i32,
                    DISPLAY_WIDTH as i32,
                    (y + rows) as i32,
                    self.band.as_ptr() as *const c_void,
                )
            })?;
            y += rows;
        }
        self.wait_idle();
        Ok(())
    }

    fn wait_idle(&self) {
        while !TRANS_DONE.load(Ordering::Acquire) {
            std::thread::yield_now();
        }
    }
}

impl Drop for St7789 {
    fn drop(&mut self) {
        unsafe {
            sys::esp_lcd_panel_del(self.panel);
            sys::esp_lcd_panel_io_del(self.io);
        }
    }
}
