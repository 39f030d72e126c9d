//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: how raw bytes flow to and from the adapter
//! - **Codec**: how frames are encoded/decoded (handled separately)
//!
//! The serial transport manages its own execution model internally
//! (blocking threads for low latency); tests substitute in-memory channels.

pub mod serial;

pub use serial::SerialTransport;

use bytes::Bytes;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// Channels for bidirectional communication with a transport
///
/// The transport owns the underlying I/O (the serial port handle) and
/// communicates via these channels. When the transport stops (shutdown or
/// device unplugged), it closes the channels.
pub struct TransportChannels {
    /// Receive raw bytes from the adapter
    ///
    /// Returns `None` when the transport has stopped.
    pub rx: mpsc::Receiver<Bytes>,

    /// Send raw bytes to the adapter
    pub tx: mpsc::Sender<Bytes>,
}

/// Trait for spawnable transports
///
/// A transport abstracts byte-level I/O. It handles opening the link,
/// reading/writing raw bytes and its own threading model. It does NOT
/// handle chunk framing (codec's job) or handshake/dispatch (controller's
/// job). Reads and writes run on independent threads, so a caller may
/// write concurrently with the controller's read loop without locking.
///
/// # Lifecycle
///
/// 1. Create transport with configuration
/// 2. Call `spawn()` to start I/O in background
/// 3. Use returned channels for communication
/// 4. Transport runs until `shutdown` is signaled or the link fails
/// 5. Transport closes channels when stopping
pub trait Transport: Send + 'static {
    /// Spawn the transport in background
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be opened.
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels>;
}
