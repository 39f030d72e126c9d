//! Serial transport for the USB-CAN adapter board
//!
//! Uses blocking threads for low-latency I/O:
//! - Reader thread: reads from the serial port, sends to channel
//! - Writer thread: receives from channel, writes to the serial port
//!
//! The transport stops when:
//! - `shutdown` flag is set
//! - the serial port disconnects (detected via consecutive read errors)
//! - a write error occurs

use super::{Transport, TransportChannels};
use crate::config::DeviceConfig;
use crate::constants::{CHANNEL_CAPACITY, SERIAL_BUFFER_SIZE, SERIAL_DISCONNECT_THRESHOLD};
use crate::error::{Result, UsbCanError};
use bytes::Bytes;
use serialport::{SerialPortInfo, SerialPortType};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Serial transport for USB CDC communication with the adapter
///
/// # Example
///
/// ```ignore
/// // Auto-detect the board from its USB ids
/// let device = DeviceConfig::from_toml_path("config/usbcan.toml")?;
/// let port = SerialTransport::detect(&device)?;
/// let channels = SerialTransport::new(&port).spawn(shutdown)?;
///
/// // Or specify the port directly
/// let channels = SerialTransport::new("/dev/ttyACM0").spawn(shutdown)?;
/// ```
pub struct SerialTransport {
    port_name: String,
}

impl SerialTransport {
    /// Create a new serial transport for the specified port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
        }
    }

    /// Detect a USB adapter board matching the given configuration
    ///
    /// Searches available serial ports for a device matching the VID/PID
    /// in the config.
    ///
    /// # Errors
    ///
    /// - `NoDeviceFound` - no matching device
    /// - `MultipleDevicesFound` - more than one matching device
    pub fn detect(config: &DeviceConfig) -> Result<String> {
        let ports = serialport::available_ports().unwrap_or_default();

        let matching: Vec<_> = ports.iter().filter(|p| matches_device(p, config)).collect();

        match matching.len() {
            0 => Err(UsbCanError::NoDeviceFound),
            1 => Ok(matching[0].port_name.clone()),
            n => Err(UsbCanError::MultipleDevicesFound { count: n }),
        }
    }

    /// Open a serial port for USB CDC communication
    ///
    /// Baud rate is ignored for USB CDC devices (native USB speed).
    /// The short read timeout bounds every blocking read, so the reader
    /// thread re-checks the shutdown flag at a bounded interval.
    pub fn open(port_name: &str) -> Result<Box<dyn serialport::SerialPort>> {
        const USB_CDC_BAUD: u32 = 115200;

        serialport::new(port_name, USB_CDC_BAUD)
            .timeout(std::time::Duration::from_millis(1))
            .open()
            .map_err(|e| UsbCanError::SerialOpen {
                port: port_name.to_string(),
                source: std::io::Error::other(e.to_string()),
            })
    }
}

/// Check if a serial port matches the device configuration
fn matches_device(port: &SerialPortInfo, config: &DeviceConfig) -> bool {
    matches!(
        &port.port_type,
        SerialPortType::UsbPort(usb) if usb.vid == config.vid && config.pid_list.contains(&usb.pid)
    )
}

impl Transport for SerialTransport {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        let port_read = Self::open(&self.port_name)?;
        let port_write = port_read
            .try_clone()
            .map_err(|e| UsbCanError::SerialOpen {
                port: self.port_name.clone(),
                source: std::io::Error::other(e.to_string()),
            })?;

        // Reader thread (blocking, bounded by the 1ms port timeout)
        let shutdown_reader = shutdown.clone();
        let port_name = self.port_name.clone();
        std::thread::spawn(move || {
            let mut port = port_read;
            let mut buf = [0u8; SERIAL_BUFFER_SIZE];
            let mut consecutive_errors = 0u32;

            while !shutdown_reader.load(Ordering::Relaxed) {
                match port.read(&mut buf) {
                    Ok(n) if n > 0 => {
                        consecutive_errors = 0;
                        if in_tx
                            .blocking_send(Bytes::copy_from_slice(&buf[..n]))
                            .is_err()
                        {
                            // Channel closed, receiver dropped
                            break;
                        }
                    }
                    Ok(_) => {
                        // Zero bytes read - could be normal or port gone
                        consecutive_errors += 1;
                        if consecutive_errors > SERIAL_DISCONNECT_THRESHOLD {
                            warn!(port = %port_name, "serial port disconnected");
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Normal timeout, reset error counter
                        consecutive_errors = 0;
                    }
                    Err(e) => {
                        warn!(port = %port_name, error = %e, "serial read failed");
                        break;
                    }
                }
            }
            debug!(port = %port_name, "serial reader stopped");
            // Channel closes when in_tx is dropped
        });

        // Writer thread (blocking)
        let shutdown_writer = shutdown.clone();
        std::thread::spawn(move || {
            let mut port = port_write;

            loop {
                if shutdown_writer.load(Ordering::Relaxed) {
                    break;
                }

                match out_rx.blocking_recv() {
                    Some(data) => {
                        if port.write_all(&data).is_err() {
                            // Write error - port disconnected
                            break;
                        }
                    }
                    None => {
                        // Channel closed - all senders dropped
                        break;
                    }
                }
            }
            debug!("serial writer stopped");
        });

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}
