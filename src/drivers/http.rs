// MiBuddy — HTTP Transport for the Remote Decision Service

use std::time::Duration;

use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::http::Method;

use crate::config::*;
use crate::error::{MochiError, Result};
use crate::input::RemoteTransport;

fn io_err(what: &str, e: impl core::fmt::Display) -> MochiError {
    MochiError::Io(format!("{}: {}", what, e))
}

/// Opens a fresh connection per request; the service is polled rarely.
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { timeout: Duration::from_millis(REMOTE_TIMEOUT_MS) }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTransport for HttpTransport {
    fn post_json(&mut self, url: &str, body: &str) -> Result<(u16, String)> {
        let mut conn = EspHttpConnection::new(&Configuration {
            timeout: Some(self.timeout),
            ..Default::default()
        })
        .map_err(|e| io_err("http init", e))?;

        let len = body.len().to_string();
        let headers = [("Content-Type", "application/json"), ("Content-Length", len.as_str())];
        conn.initiate_request(Method::Post, url, &headers)
            .map_err(|e| io_err("http open", e))?;

        let mut sent = 0;
        while sent < body.len() {
            sent += conn
                .write(&body.as_bytes()[sent..])
                .map_err(|e| io_err("http write", e))?;
        }

        conn.initiate_response().map_err(|e| io_err("http fetch", e))?;
        let status = conn.status();

        let mut buf = [0u8; REMOTE_RESPONSE_MAX];
        let mut len = 0;
        while len < buf.len() {
            let n = conn.read(&mut buf[len..]).map_err(|e| io_err("http read", e))?;
            if n == 0 {
                break;
            }
            len += n;
        }
        Ok((status, String::from_utf8_lossy(&buf[..len]).into_owned()))
    }
}
