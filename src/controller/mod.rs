//! Controller: owns the serial link and runs the read/dispatch loop
//!
//! One controller per serial port. The controller:
//! - exposes [`Controller::write`] (encode + stuff + queue for the writer
//!   thread, callable concurrently with the read loop)
//! - maintains the registered adaptor list and fans every decoded frame out
//!   to each adaptor in registration order
//! - drives the handshake until the adapter answers the greeting
//! - terminates cooperatively: `stop()` sets a shared flag the loop and the
//!   serial threads poll at a bounded interval
//!
//! The read loop is not restartable; recreate the controller to reconnect.

pub mod handshake;
pub mod stats;

pub use handshake::HandshakeState;
pub use stats::Stats;

use crate::adaptor::{Adaptor, FrameWriter};
use crate::codec::{CanFrame, FrameStream, StreamEvent, GREETING_REQUEST};
use crate::config::{ControllerConfig, FaultPolicy};
use crate::constants::SHUTDOWN_POLL_MS;
use crate::error::{Result, UsbCanError};
use crate::transport::{SerialTransport, Transport, TransportChannels};
use bytes::Bytes;
use handshake::HandshakeShared;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Controller for one USB-CAN adapter board
pub struct Controller {
    /// Incoming raw bytes; taken by `start()`, present only before the loop runs
    rx: Option<mpsc::Receiver<Bytes>>,
    /// Raw outgoing channel, used for the unstuffed greeting datagram
    tx: mpsc::Sender<Bytes>,
    writer: FrameWriter,
    adaptors: Arc<Mutex<Vec<Box<dyn Adaptor>>>>,
    handshake: Arc<HandshakeShared>,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    stats: Arc<Stats>,
    config: ControllerConfig,
}

impl Controller {
    /// Open the named serial port and build a controller on top of it
    pub fn open(port: &str, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let channels = SerialTransport::new(port).spawn(shutdown.clone())?;
        Ok(Self::with_shutdown(channels, shutdown, config))
    }

    /// Build a controller over already-spawned transport channels
    ///
    /// The transport keeps its own shutdown flag; `stop()` on this controller
    /// only ends the read loop. Prefer [`Controller::open`] for real ports.
    pub fn new(channels: TransportChannels, config: ControllerConfig) -> Self {
        Self::with_shutdown(channels, Arc::new(AtomicBool::new(false)), config)
    }

    fn with_shutdown(
        channels: TransportChannels,
        shutdown: Arc<AtomicBool>,
        config: ControllerConfig,
    ) -> Self {
        let stats = Arc::new(Stats::new());
        let writer = FrameWriter::new(channels.tx.clone(), stats.clone());
        Self {
            rx: Some(channels.rx),
            tx: channels.tx,
            writer,
            adaptors: Arc::new(Mutex::new(Vec::new())),
            handshake: Arc::new(HandshakeShared::new()),
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
            stats,
            config,
        }
    }

    /// Register an adaptor for frame dispatch
    ///
    /// Appends to the dispatch list (insertion order = dispatch order) and
    /// binds the write capability into the adaptor. The list is lock
    /// protected, so registering after `start()` is race-free; it simply
    /// misses frames read earlier.
    pub fn registration(&self, mut adaptor: Box<dyn Adaptor>) {
        adaptor.bind_writer(self.writer.clone());
        self.adaptors.lock().push(adaptor);
    }

    /// Encode, stuff and queue one frame for transmission
    ///
    /// Synchronous and safe to call concurrently with the read loop; no
    /// acknowledgement is awaited.
    pub fn write(&self, frame: &CanFrame) -> Result<()> {
        self.writer.write(frame)
    }

    /// A cheap-clone write handle, usable by external collaborators
    pub fn writer(&self) -> FrameWriter {
        self.writer.clone()
    }

    /// Start the background read/dispatch loop
    ///
    /// Spawns a tokio task; requires a live runtime. Calling twice fails
    /// with [`UsbCanError::AlreadyStarted`].
    pub fn start(&mut self) -> Result<()> {
        let rx = self.rx.take().ok_or(UsbCanError::AlreadyStarted)?;

        let adaptors = self.adaptors.clone();
        let handshake = self.handshake.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();
        let policy = self.config.fault_policy;

        running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            read_loop(rx, &adaptors, &handshake, &shutdown, &stats, policy).await;
            running.store(false, Ordering::SeqCst);
            debug!("read loop stopped");
        });

        Ok(())
    }

    /// Request cooperative termination of the read loop and serial threads
    ///
    /// Does not interrupt an in-flight blocking read; the loop observes the
    /// flag within its bounded poll interval.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether the read loop is currently live
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn handshake_confirmed(&self) -> bool {
        self.handshake.is_confirmed()
    }

    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    /// Probe the adapter until it answers the greeting
    ///
    /// Writes the fixed greeting datagram (already delimiter-terminated,
    /// sent unstuffed) every probe interval. The read loop must be running,
    /// since only it can observe the reply. Bounded by
    /// `config.probe_limit`; `None` probes until shutdown.
    pub async fn handshake(&self) -> Result<()> {
        if self.handshake.is_confirmed() {
            return Ok(());
        }
        self.handshake.begin_probing();

        let interval = Duration::from_millis(self.config.probe_interval_ms);
        let mut probes = 0u32;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(UsbCanError::LinkClosed);
            }

            self.tx
                .try_send(Bytes::from_static(&GREETING_REQUEST))
                .map_err(|e| match e {
                    TrySendError::Full(_) => UsbCanError::TxBacklog,
                    TrySendError::Closed(_) => UsbCanError::LinkClosed,
                })?;
            probes += 1;

            tokio::time::sleep(interval).await;

            if self.handshake.is_confirmed() {
                info!(probes, "handshake success, adapter is alive");
                return Ok(());
            }

            if let Some(limit) = self.config.probe_limit {
                if probes >= limit {
                    return Err(UsbCanError::AdapterUnresponsive { probes });
                }
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// The read/dispatch loop
///
/// Pulls raw byte slices off the transport, feeds the frame stream and acts
/// on each event. A frame fault drops only the offending chunk (policy
/// permitting); the transport closing its channel ends the loop cleanly.
async fn read_loop(
    mut rx: mpsc::Receiver<Bytes>,
    adaptors: &Mutex<Vec<Box<dyn Adaptor>>>,
    handshake: &HandshakeShared,
    shutdown: &AtomicBool,
    stats: &Stats,
    policy: FaultPolicy,
) {
    let mut stream = FrameStream::new();

    'outer: loop {
        tokio::select! {
            biased;

            // Periodic shutdown check
            _ = tokio::time::sleep(Duration::from_millis(SHUTDOWN_POLL_MS)) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }

            data = rx.recv() => {
                let Some(data) = data else {
                    // Transport fault: link gone, terminate cleanly
                    warn!("serial link closed, terminating read loop");
                    shutdown.store(true, Ordering::SeqCst);
                    break;
                };

                stream.feed(&data);
                for event in stream.by_ref() {
                    match event {
                        Ok(StreamEvent::HandshakeReply) => {
                            // Consumed here, never dispatched as a frame
                            info!("adapter answered handshake greeting");
                            handshake.confirm();
                        }
                        Ok(StreamEvent::Frame(frame)) => {
                            stats.add_frame_rx();
                            dispatch(adaptors, &frame, stats);
                        }
                        Err(fault) => {
                            stats.add_frame_fault();
                            match policy {
                                FaultPolicy::Log => warn!(%fault, "dropped malformed chunk"),
                                FaultPolicy::Silent => {}
                                FaultPolicy::Stop => {
                                    warn!(%fault, "malformed chunk, stopping read loop");
                                    shutdown.store(true, Ordering::SeqCst);
                                    break 'outer;
                                }
                            }
                        }
                    }
                }

                // Continuous traffic can keep this branch winning the
                // select, so the flag must be observed here too, not only
                // via the periodic sleep.
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }
}

/// Fan one frame out to every registered adaptor, in registration order
///
/// Failures are isolated per adaptor: an error from one is logged and
/// counted, and delivery continues to the rest.
fn dispatch(adaptors: &Mutex<Vec<Box<dyn Adaptor>>>, frame: &CanFrame, stats: &Stats) {
    for adaptor in adaptors.lock().iter_mut() {
        if let Err(e) = adaptor.handle_frame(frame) {
            stats.add_adaptor_error();
            warn!(error = %e, %frame, "adaptor failed to handle frame");
        }
    }
}
