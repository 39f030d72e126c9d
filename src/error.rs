//! Centralized error types for the driver
//!
//! Fatal and API-level errors are represented by the `UsbCanError` enum.
//! Per-chunk recoverable decode faults live in [`crate::codec::FrameFault`].
//! Use `Result<T>` as shorthand for `std::result::Result<T, UsbCanError>`.

use std::fmt;
use std::path::PathBuf;

/// All fatal and API-level driver errors
#[derive(Debug)]
pub enum UsbCanError {
    // === Serial link ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// The serial link is closed (transport stopped or controller dropped)
    LinkClosed,
    /// The outgoing write channel is full
    TxBacklog,

    // === Detection ===
    /// No adapter board found matching configuration
    NoDeviceFound,
    /// Multiple adapter boards found matching configuration
    MultipleDevicesFound { count: usize },

    // === Controller lifecycle ===
    /// `start()` was called on a controller whose read loop is already live
    AlreadyStarted,
    /// The adapter never answered the handshake greeting
    AdapterUnresponsive { probes: u32 },

    // === Config ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
}

impl std::error::Error for UsbCanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. } | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for UsbCanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial port: {}", port),
            Self::LinkClosed => write!(f, "Serial link closed"),
            Self::TxBacklog => write!(f, "Write channel full, frame dropped"),
            Self::NoDeviceFound => write!(f, "No adapter board found"),
            Self::MultipleDevicesFound { count } => {
                write!(f, "Multiple adapter boards found ({})", count)
            }
            Self::AlreadyStarted => write!(f, "Controller read loop already started"),
            Self::AdapterUnresponsive { probes } => {
                write!(f, "Adapter unresponsive after {} handshake probes", probes)
            }
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
        }
    }
}

/// Alias for Result with UsbCanError
pub type Result<T> = std::result::Result<T, UsbCanError>;
