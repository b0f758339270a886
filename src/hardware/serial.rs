//! Serial adapter for the USB-serial controller bridge
//!
//! Wraps a `serialport` port opened at the adapter's fixed line speed.

use super::SampleSource;
use crate::error::{AppResult, CaptureError};
use crate::sample::BAUD_RATE;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;

/// Internal read timeout. Reads are only issued once enough bytes are
/// buffered, so this only bounds a read against a device that vanished between
/// the length check and the read.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial connection to the controller adapter.
pub struct SerialSampleSource {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Line speed the port was opened with
    baud_rate: u32,

    port: Box<dyn SerialPort>,
}

impl SerialSampleSource {
    /// Open `port_name` at 115200 baud.
    pub fn open(port_name: &str) -> AppResult<Self> {
        Self::open_with_baud(port_name, BAUD_RATE)
    }

    /// Open `port_name` at a specific line speed.
    pub fn open_with_baud(port_name: &str, baud_rate: u32) -> AppResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                CaptureError::Serial(format!(
                    "Failed to open serial port '{port_name}' at {baud_rate} baud: {e}"
                ))
            })?;

        debug!(port = port_name, baud_rate, "Serial port opened");

        Ok(Self {
            port_name: port_name.to_string(),
            baud_rate,
            port,
        })
    }

    /// Port name this source was opened with.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl SampleSource for SerialSampleSource {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let count = self.port.bytes_to_read()?;
        Ok(count as usize)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.port.read_exact(buf)
    }

    /// The count is taken right before the clear; bytes landing in between
    /// are dropped uncounted.
    fn discard_input(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read()?;
        self.port.clear(ClearBuffer::Input)?;
        Ok(pending as usize)
    }

    fn describe(&self) -> String {
        format!("SerialSampleSource({} @ {} baud)", self.port_name, self.baud_rate)
    }
}

impl Drop for SerialSampleSource {
    fn drop(&mut self) {
        debug!(port = %self.port_name, "Serial port closed");
    }
}
