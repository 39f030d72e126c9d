//! Crate-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Channels
// =============================================================================

/// Channel capacity for async message passing between the serial threads
/// and the controller
pub const CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Serial
// =============================================================================

/// Serial read buffer size
pub const SERIAL_BUFFER_SIZE: usize = 4096;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// Timing
// =============================================================================

/// Interval at which the read loop re-checks the shutdown flag (milliseconds)
pub const SHUTDOWN_POLL_MS: u64 = 100;

/// Default interval between handshake greeting probes (milliseconds)
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1000;

/// Default number of handshake probes before giving up
pub const DEFAULT_PROBE_LIMIT: u32 = 10;
