//! Configuration
//!
//! `ControllerConfig` tunes the handshake and fault policy; `DeviceConfig`
//! drives USB auto-detection of the adapter board. Both deserialize from
//! TOML, with sensible defaults when constructed directly.

use crate::constants::{DEFAULT_PROBE_INTERVAL_MS, DEFAULT_PROBE_LIMIT};
use crate::error::{Result, UsbCanError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// =============================================================================
// Controller Configuration
// =============================================================================

/// Policy applied when a chunk off the wire fails to unstuff or decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Log the fault at warn level and keep reading (default)
    #[default]
    Log,
    /// Drop the chunk without logging (the fault counter still ticks)
    Silent,
    /// Treat the fault as fatal and stop the read loop
    Stop,
}

/// Controller tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Interval between handshake greeting probes, in milliseconds
    pub probe_interval_ms: u64,
    /// Number of probes before the handshake gives up.
    /// `None` probes forever, matching the adapter firmware's expectation
    /// that the host keeps greeting until the board boots.
    pub probe_limit: Option<u32>,
    /// What to do with malformed chunks
    pub fault_policy: FaultPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            probe_limit: Some(DEFAULT_PROBE_LIMIT),
            fault_policy: FaultPolicy::default(),
        }
    }
}

impl ControllerConfig {
    /// Load from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| UsbCanError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| UsbCanError::ConfigValidation {
            field: "controller",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_interval_ms == 0 {
            return Err(UsbCanError::ConfigValidation {
                field: "probe_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.probe_limit == Some(0) {
            return Err(UsbCanError::ConfigValidation {
                field: "probe_limit",
                reason: "must be greater than zero (use None for unbounded)".into(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Device Configuration
// =============================================================================

/// USB device detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name for the adapter board
    pub name: String,
    /// USB Vendor ID
    pub vid: u16,
    /// List of accepted USB Product IDs
    pub pid_list: Vec<u16>,
}

/// Wrapper for device preset file format
#[derive(Debug, Deserialize)]
struct DevicePresetFile {
    device: DeviceConfig,
}

impl DeviceConfig {
    /// Load a `[device]` preset from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| UsbCanError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let preset: DevicePresetFile =
            toml::from_str(&text).map_err(|e| UsbCanError::ConfigValidation {
                field: "device",
                reason: e.to_string(),
            })?;
        Ok(preset.device)
    }
}
