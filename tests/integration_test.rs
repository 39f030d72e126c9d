//! Integration tests for the controller
//!
//! Drives the full path (stuffed wire chunks -> stream -> decode ->
//! dispatch, and handshake probing) over in-memory channels standing in
//! for the serial link.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use usbcan_link::codec::{cobs, GREETING_REPLY, GREETING_REQUEST};
use usbcan_link::{
    Adaptor, AdaptorError, CanFrame, Controller, ControllerConfig, FaultPolicy, FrameWriter,
    TransportChannels, UsbCanError,
};

// =============================================================================
// Test doubles
// =============================================================================

/// In-memory stand-in for the serial link
struct MockLink {
    /// Feed bytes "from the adapter" into the controller
    to_controller: mpsc::Sender<Bytes>,
    /// Observe bytes the controller wrote "to the adapter"
    from_controller: mpsc::Receiver<Bytes>,
}

fn mock_link() -> (TransportChannels, MockLink) {
    let (in_tx, in_rx) = mpsc::channel::<Bytes>(64);
    let (out_tx, out_rx) = mpsc::channel::<Bytes>(64);

    (
        TransportChannels {
            rx: in_rx,
            tx: out_tx,
        },
        MockLink {
            to_controller: in_tx,
            from_controller: out_rx,
        },
    )
}

/// Adaptor recording every frame it sees into a shared journal
struct RecordingAdaptor {
    tag: &'static str,
    journal: Arc<Mutex<Vec<(&'static str, u32)>>>,
    /// When set, handle_frame fails for every frame
    failing: bool,
}

impl RecordingAdaptor {
    fn new(tag: &'static str, journal: Arc<Mutex<Vec<(&'static str, u32)>>>) -> Self {
        Self {
            tag,
            journal,
            failing: false,
        }
    }

    fn failing(tag: &'static str, journal: Arc<Mutex<Vec<(&'static str, u32)>>>) -> Self {
        Self {
            failing: true,
            ..Self::new(tag, journal)
        }
    }
}

impl Adaptor for RecordingAdaptor {
    fn handle_frame(&mut self, frame: &CanFrame) -> Result<(), AdaptorError> {
        if self.failing {
            return Err(format!("{} rejected frame {}", self.tag, frame).into());
        }
        self.journal.lock().push((self.tag, frame.id()));
        Ok(())
    }

    fn bind_writer(&mut self, _writer: FrameWriter) {}
}

fn stuffed(raw: &[u8]) -> Bytes {
    let mut out = Vec::new();
    cobs::stuff(raw, &mut out);
    Bytes::from(out)
}

fn stuffed_frame(id: u32, data: &[u8]) -> Bytes {
    stuffed(&CanFrame::new(id, data).unwrap().encode())
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn dispatch_fan_out_in_registration_order() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    let journal = Arc::new(Mutex::new(Vec::new()));
    controller.registration(Box::new(RecordingAdaptor::new("a", journal.clone())));
    controller.registration(Box::new(RecordingAdaptor::new("b", journal.clone())));
    controller.start().unwrap();

    link.to_controller
        .send(stuffed_frame(0x42, &[1, 2]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Exactly one call per adaptor, in registration order
    assert_eq!(*journal.lock(), vec![("a", 0x42), ("b", 0x42)]);
    assert_eq!(controller.stats().frames_rx(), 1);

    controller.stop();
}

#[tokio::test]
async fn adaptor_failure_does_not_block_others() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    let journal = Arc::new(Mutex::new(Vec::new()));
    controller.registration(Box::new(RecordingAdaptor::failing("bad", journal.clone())));
    controller.registration(Box::new(RecordingAdaptor::new("good", journal.clone())));
    controller.start().unwrap();

    link.to_controller
        .send(stuffed_frame(0x7, &[]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*journal.lock(), vec![("good", 0x7)]);
    assert_eq!(controller.stats().adaptor_errors(), 1);

    controller.stop();
}

#[tokio::test]
async fn malformed_chunk_then_valid_frame() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    let journal = Arc::new(Mutex::new(Vec::new()));
    controller.registration(Box::new(RecordingAdaptor::new("a", journal.clone())));
    controller.start().unwrap();

    // Invalid stuffing (code 0xFF, short group), then a valid frame
    link.to_controller
        .send(Bytes::from_static(&[0xFF, 0x05, 0x00]))
        .await
        .unwrap();
    link.to_controller
        .send(stuffed_frame(0x99, &[0xAB]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*journal.lock(), vec![("a", 0x99)]);
    assert_eq!(controller.stats().frame_faults(), 1);
    assert_eq!(controller.stats().frames_rx(), 1);
    assert!(controller.is_running());

    controller.stop();
}

#[tokio::test]
async fn stop_policy_terminates_on_fault() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(
        channels,
        ControllerConfig {
            fault_policy: FaultPolicy::Stop,
            ..Default::default()
        },
    );
    controller.start().unwrap();

    link.to_controller
        .send(Bytes::from_static(&[0xFF, 0x05, 0x00]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!controller.is_running());
    assert_eq!(controller.stats().frame_faults(), 1);
}

#[tokio::test]
async fn frame_split_across_reads_is_dispatched() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    let journal = Arc::new(Mutex::new(Vec::new()));
    controller.registration(Box::new(RecordingAdaptor::new("a", journal.clone())));
    controller.start().unwrap();

    let wire = stuffed_frame(0x123, &[9, 8, 7]);
    let (head, tail) = wire.split_at(4);
    link.to_controller
        .send(Bytes::copy_from_slice(head))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(journal.lock().is_empty());

    link.to_controller
        .send(Bytes::copy_from_slice(tail))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*journal.lock(), vec![("a", 0x123)]);

    controller.stop();
}

#[tokio::test]
async fn stop_observed_under_continuous_traffic() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());
    controller.start().unwrap();

    // Feed frames far faster than the loop's periodic shutdown poll
    let feeder = tokio::spawn(async move {
        let to_controller = link.to_controller;
        for _ in 0..200 {
            if to_controller
                .send(stuffed_frame(0x1, &[0xEE]))
                .await
                .is_err()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(controller.is_running());

    controller.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!controller.is_running());

    feeder.abort();
}

// =============================================================================
// Handshake
// =============================================================================

/// Echo the greeting reply after the adapter has seen `answer_after` probes
async fn adapter_stub(
    mut from_controller: mpsc::Receiver<Bytes>,
    to_controller: mpsc::Sender<Bytes>,
    answer_after: u32,
) -> u32 {
    let mut probes = 0u32;
    while let Some(data) = from_controller.recv().await {
        if data.as_ref() == GREETING_REQUEST {
            probes += 1;
            if probes == answer_after {
                let _ = to_controller.send(stuffed(GREETING_REPLY)).await;
                break;
            }
        }
    }
    probes
}

#[tokio::test]
async fn handshake_confirms_after_n_probes() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(
        channels,
        ControllerConfig {
            probe_interval_ms: 20,
            probe_limit: Some(10),
            ..Default::default()
        },
    );
    controller.start().unwrap();
    assert!(!controller.handshake_confirmed());

    let stub = tokio::spawn(adapter_stub(link.from_controller, link.to_controller, 3));

    controller.handshake().await.unwrap();
    assert!(controller.handshake_confirmed());
    assert_eq!(stub.await.unwrap(), 3);

    controller.stop();
}

#[tokio::test]
async fn handshake_is_idempotent_once_confirmed() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(
        channels,
        ControllerConfig {
            probe_interval_ms: 20,
            ..Default::default()
        },
    );
    controller.start().unwrap();

    let stub = tokio::spawn(adapter_stub(link.from_controller, link.to_controller, 1));
    controller.handshake().await.unwrap();
    stub.await.unwrap();

    // Second call returns immediately without probing again
    controller.handshake().await.unwrap();

    controller.stop();
}

#[tokio::test]
async fn handshake_reply_is_not_dispatched_as_frame() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    let journal = Arc::new(Mutex::new(Vec::new()));
    controller.registration(Box::new(RecordingAdaptor::new("a", journal.clone())));
    controller.start().unwrap();

    link.to_controller
        .send(stuffed(GREETING_REPLY))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(controller.handshake_confirmed());
    assert!(journal.lock().is_empty());
    assert_eq!(controller.stats().frames_rx(), 0);

    controller.stop();
}

// =============================================================================
// Adaptor-issued sends
// =============================================================================

/// Adaptor that answers every frame by writing one back, doubling the id
struct EchoAdaptor {
    writer: Option<FrameWriter>,
}

impl Adaptor for EchoAdaptor {
    fn handle_frame(&mut self, frame: &CanFrame) -> Result<(), AdaptorError> {
        let writer = self.writer.as_ref().ok_or("writer not bound")?;
        let reply = CanFrame::new(frame.id() * 2, frame.data())?;
        writer.write(&reply)?;
        Ok(())
    }

    fn bind_writer(&mut self, writer: FrameWriter) {
        self.writer = Some(writer);
    }
}

#[tokio::test]
async fn adaptor_can_write_from_handle_frame() {
    let (channels, mut link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());

    controller.registration(Box::new(EchoAdaptor { writer: None }));
    controller.start().unwrap();

    link.to_controller
        .send(stuffed_frame(0x10, &[0xAA]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let chunk = link.from_controller.recv().await.unwrap();
    let mut raw = Vec::new();
    cobs::unstuff(&chunk[..chunk.len() - 1], &mut raw).unwrap();
    let echoed = CanFrame::decode(&raw).unwrap();
    assert_eq!(echoed.id(), 0x20);
    assert_eq!(echoed.data(), &[0xAA]);

    controller.stop();
}

// =============================================================================
// Transport fault
// =============================================================================

#[tokio::test]
async fn link_closure_marks_controller_stopped() {
    let (channels, link) = mock_link();
    let mut controller = Controller::new(channels, ControllerConfig::default());
    controller.start().unwrap();

    drop(link.to_controller);
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!controller.is_running());
    assert!(matches!(
        controller.write(&CanFrame::new(1, &[]).unwrap()),
        // Writes still queue until the out channel itself closes; the loop
        // being stopped is the observable contract here
        Ok(()) | Err(UsbCanError::LinkClosed)
    ));
}
