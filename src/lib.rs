//! Host-side driver for USB-CAN adapter boards over byte-stuffed serial
//!
//! Talks to a USB-attached CAN adapter through a self-delimiting serial
//! protocol: CAN frames are laid out in a fixed 6-byte-header format, COBS
//! stuffed so `0x00` can delimit chunks, and exchanged over a full-duplex
//! serial link. The [`Controller`] performs a greeting handshake to confirm
//! the board is alive, then fans every received frame out to registered
//! [`Adaptor`]s while callers transmit concurrently.
//!
//! # Example
//!
//! ```ignore
//! use usbcan_link::{CanFrame, Controller, ControllerConfig};
//!
//! #[tokio::main]
//! async fn main() -> usbcan_link::Result<()> {
//!     usbcan_link::logging::init_tracing(false);
//!
//!     let mut controller = Controller::open("/dev/ttyACM0", ControllerConfig::default())?;
//!     controller.registration(Box::new(MyMotorAdaptor::new(0x200)));
//!     controller.start()?;
//!     controller.handshake().await?;
//!
//!     let frame = CanFrame::new(0x01, &[1, 2, 3, 4, 5, 6, 7, 8]).expect("payload fits");
//!     controller.write(&frame)?;
//!     Ok(())
//! }
//! ```

pub mod adaptor;
pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod logging;
pub mod transport;

pub use adaptor::{Adaptor, AdaptorError, FrameWriter};
pub use codec::{CanFrame, FrameFault, FrameStream, StreamEvent};
pub use config::{ControllerConfig, DeviceConfig, FaultPolicy};
pub use controller::{Controller, HandshakeState, Stats};
pub use error::{Result, UsbCanError};
pub use transport::{SerialTransport, Transport, TransportChannels};
