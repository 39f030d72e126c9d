//! Adaptor capability and the write handle bound into it
//!
//! An adaptor represents a logical device on the CAN bus (a motor driver,
//! a sensor node). The controller hands every successfully decoded frame to
//! every registered adaptor, in registration order. Device-specific logic
//! lives entirely behind this trait; the core only needs `handle_frame` and
//! a place to bind the write capability.

use crate::codec::{cobs, frame::HEADER_LEN, CanFrame};
use crate::controller::Stats;
use crate::error::{Result, UsbCanError};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Error type adaptors may surface from `handle_frame`
///
/// Returned errors are logged and counted by the dispatch loop; they never
/// abort the loop or block delivery to other adaptors.
pub type AdaptorError = Box<dyn std::error::Error + Send + Sync>;

/// A logical CAN device handled through the controller
pub trait Adaptor: Send {
    /// Receive one decoded frame
    ///
    /// Called from the controller's read loop for every frame, in
    /// registration order. Must not block.
    fn handle_frame(&mut self, frame: &CanFrame) -> std::result::Result<(), AdaptorError>;

    /// Receive the write capability at registration time
    ///
    /// Called exactly once per `registration`; registering the same adaptor
    /// again overwrites the previously bound writer.
    fn bind_writer(&mut self, writer: FrameWriter);
}

/// Cheap-clone write capability handed to adaptors
///
/// Encodes, stuffs and queues a frame for the serial writer thread. Safe to
/// call concurrently with the read loop; the serial link is full duplex and
/// the writer thread is the only place port writes happen.
#[derive(Clone)]
pub struct FrameWriter {
    tx: mpsc::Sender<Bytes>,
    stats: Arc<Stats>,
}

impl FrameWriter {
    pub(crate) fn new(tx: mpsc::Sender<Bytes>, stats: Arc<Stats>) -> Self {
        Self { tx, stats }
    }

    /// Encode and queue one frame for transmission
    ///
    /// Synchronous; no acknowledgement is awaited. Fails with `TxBacklog`
    /// when the write channel is full and `LinkClosed` when the transport
    /// has stopped.
    pub fn write(&self, frame: &CanFrame) -> Result<()> {
        let mut raw = Vec::with_capacity(HEADER_LEN + frame.dlc() as usize);
        frame.encode_into(&mut raw);

        let mut chunk = Vec::with_capacity(raw.len() + 2);
        cobs::stuff(&raw, &mut chunk);

        self.tx.try_send(Bytes::from(chunk)).map_err(|e| match e {
            TrySendError::Full(_) => UsbCanError::TxBacklog,
            TrySendError::Closed(_) => UsbCanError::LinkClosed,
        })?;

        self.stats.add_frame_tx();
        Ok(())
    }
}
