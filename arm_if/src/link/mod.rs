//! # Device Link Module
//!
//! This module provides the framed, line oriented request/response protocol spoken by the arm's
//! controller board over a serial connection.
//!
//! A frame is a start byte (`<`), the payload, and an end byte (`>`). The board has no interrupt
//! driven acknowledgement, so every exchange is a bounded poll of the incoming bytes:
//!
//! 1. On open the board prints `setup complete` once it is ready.
//! 2. For each frame the link writes `<` and waits for the board to print `ready` before
//!    writing the payload and `>`.
//! 3. The board then prints one or more reply lines.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated arm controller board, used for dry runs and tests.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fmt,
    io::{self, Read, Write},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use util::time::seconds_to_duration;

use crate::eqpt::arm::{DeviceCommand, DeviceReply};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Start of frame marker.
pub const FRAME_START: u8 = b'<';

/// End of frame marker.
pub const FRAME_END: u8 = b'>';

/// Line printed by the board once its setup is complete.
pub const SETUP_COMPLETE_TOKEN: &str = "setup complete";

/// Line printed by the board when it is ready to receive a frame's payload.
pub const READY_TOKEN: &str = "ready";

/// Size of the board's receive buffer, including the string terminator.
pub const MAX_FRAME_CHARS: usize = 64;

/// Maximum number of bytes read from the port in one go.
const RX_CHUNK_SIZE: usize = 256;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A byte stream connection to the board.
///
/// Reads must not block for longer than a short port timeout, the link only reads bytes it has
/// been told are waiting.
pub trait SerialIo: Read + Write + Send {
    /// Number of bytes that can be read without blocking.
    fn bytes_waiting(&mut self) -> io::Result<usize>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Options for a [`DeviceLink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Baud rate used when opening a serial port.
    pub baud_rate: u32,

    /// Timeout for the handshake, for the board to become ready for a frame, and the idle
    /// timeout between reply lines.
    ///
    /// Units: seconds
    pub timeout_s: f64,

    /// Sleep between polls of the incoming bytes.
    ///
    /// Units: seconds
    pub poll_interval_s: f64,

    /// Optional absolute limit on the time spent waiting for the reply to a single command,
    /// regardless of how often lines arrive.
    ///
    /// Units: seconds
    pub receive_limit_s: Option<f64>,
}

/// The framed link to the arm's controller board.
///
/// The link exclusively owns its connection. It is generic over the connection so that the
/// simulated board can stand in for a serial port.
pub struct DeviceLink<T: SerialIo> {
    io: Option<T>,

    state: LinkState,

    options: LinkOptions,

    /// Bytes received but not yet consumed as complete lines
    rx_buf: Vec<u8>,

    /// Path of the serial port, if the link was opened from one
    port_path: Option<String>,
}

/// The link over a real serial port.
pub type SerialPortIo = Box<dyn SerialPort>;

/// Result of a handshake on a new connection. On failure the link still holds the connection.
pub type Connected<T> = Result<DeviceLink<T>, (DeviceLink<T>, LinkError)>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The connection state of a [`DeviceLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection is held.
    Closed,

    /// Connected, but the board has not yet reported that its setup is complete.
    HandshakeWait,

    /// Connected and ready to exchange frames.
    Ready,
}

/// The stage of the protocol at which a timeout occured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    Handshake,
    SendReady,
    Receive,
}

/// Errors which can occur on a [`DeviceLink`].
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Timed out after {1:?} during {0}")]
    Timeout(LinkStage, Duration),

    #[error("The link is not ready (state: {0:?})")]
    NotReady(LinkState),

    #[error("Payload {0:?} cannot be framed: {1}")]
    InvalidPayload(String, &'static str),

    #[error("Serial I/O error: {0}")]
    Io(io::Error),

    #[error("Could not open serial port {0}: {1}")]
    Open(String, serialport::Error),

    #[error("The link was not opened from a serial port and cannot be reopened")]
    NoPortPath,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout_s: 10.0,
            poll_interval_s: 0.01,
            receive_limit_s: None,
        }
    }
}

impl LinkOptions {
    pub fn timeout(&self) -> Duration {
        seconds_to_duration(self.timeout_s)
    }

    pub fn poll_interval(&self) -> Duration {
        seconds_to_duration(self.poll_interval_s)
    }

    pub fn receive_limit(&self) -> Option<Duration> {
        self.receive_limit_s.map(seconds_to_duration)
    }
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStage::Handshake => write!(f, "the handshake (waiting for {:?})", SETUP_COMPLETE_TOKEN),
            LinkStage::SendReady => write!(f, "a send (waiting for {:?})", READY_TOKEN),
            LinkStage::Receive => write!(f, "a receive"),
        }
    }
}

impl LinkError {
    /// Returns true if this error is a protocol timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout(..))
    }
}

impl SerialIo for SerialPortIo {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        SerialPort::bytes_to_read(&**self)
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }
}

impl DeviceLink<SerialPortIo> {
    /// Open the serial port at `path` and perform the handshake.
    ///
    /// The outer error means the port could not be opened. If the handshake times out the port is
    /// left open and the link is returned alongside the error, as with [`DeviceLink::connect`].
    /// The caller must close it, or retry with [`DeviceLink::reopen`].
    pub fn open(path: &str, options: LinkOptions) -> Result<Connected<SerialPortIo>, LinkError> {
        let io = open_port(path, &options)?;

        let mut link = Self::new(io, options);
        link.port_path = Some(path.to_string());

        Ok(match link.handshake() {
            Ok(()) => Ok(link),
            Err(e) => Err((link, e)),
        })
    }

    /// Close the link and open its serial port again, repeating the handshake.
    pub fn reopen(&mut self) -> Result<(), LinkError> {
        let path = self.port_path.clone().ok_or(LinkError::NoPortPath)?;

        self.close();

        let io = open_port(&path, &self.options)?;
        self.reconnect(io)
    }
}

impl<T: SerialIo> DeviceLink<T> {
    /// Create a new link over an open connection.
    ///
    /// The link starts in [`LinkState::HandshakeWait`], [`DeviceLink::handshake`] must succeed
    /// before any frame can be sent.
    pub fn new(io: T, options: LinkOptions) -> Self {
        Self {
            io: Some(io),
            state: LinkState::HandshakeWait,
            options,
            rx_buf: Vec::new(),
            port_path: None,
        }
    }

    /// Create a new link and wait for the board's handshake.
    ///
    /// On timeout the link is returned alongside the error, still holding the connection in
    /// [`LinkState::HandshakeWait`]. The caller must close it.
    pub fn connect(io: T, options: LinkOptions) -> Connected<T> {
        let mut link = Self::new(io, options);

        match link.handshake() {
            Ok(()) => Ok(link),
            Err(e) => Err((link, e)),
        }
    }

    /// Close the current connection, if any, and handshake over `io` instead.
    ///
    /// On failure the link holds `io` in [`LinkState::HandshakeWait`].
    pub fn reconnect(&mut self, io: T) -> Result<(), LinkError> {
        self.close();

        self.io = Some(io);
        self.state = LinkState::HandshakeWait;

        self.handshake()
    }

    /// Wait for the board to report that its setup is complete.
    pub fn handshake(&mut self) -> Result<(), LinkError> {
        if self.state != LinkState::HandshakeWait {
            return Err(LinkError::NotReady(self.state));
        }

        debug!("Waiting for the arm controller to complete its setup");

        self.wait_for(SETUP_COMPLETE_TOKEN, LinkStage::Handshake)?;

        self.state = LinkState::Ready;
        info!("Arm controller link ready");

        Ok(())
    }

    /// Send a single frame containing `payload`.
    ///
    /// The start byte is written first. The payload and end byte are only written once the board
    /// reports it is ready, so on a timeout no payload byte is ever written.
    pub fn send(&mut self, payload: &str) -> Result<(), LinkError> {
        self.ensure_ready()?;
        validate_payload(payload)?;

        self.write_all(&[FRAME_START])?;

        if let Err(e) = self.wait_for(READY_TOKEN, LinkStage::SendReady) {
            warn!(
                "Sending frame {:?} timed out after {:?}, payload not written",
                payload, self.options.timeout()
            );
            return Err(e);
        }

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload.as_bytes());
        frame.push(FRAME_END);
        self.write_all(&frame)?;

        trace!("Sent frame <{}>", payload);

        Ok(())
    }

    /// Receive up to `expected_lines` lines.
    ///
    /// The idle timeout restarts on every line received. If it elapses, or the optional absolute
    /// receive limit is reached, the lines collected so far are returned. A short result is not
    /// an error, it is up to the caller to judge it.
    pub fn receive(&mut self, expected_lines: usize) -> Result<Vec<String>, LinkError> {
        self.ensure_ready()?;

        let timeout = self.options.timeout();
        let limit = self.options.receive_limit();
        let start = Instant::now();
        let mut last_line = start;
        let mut lines = Vec::with_capacity(expected_lines);

        while lines.len() < expected_lines {
            if let Some(line) = self.poll_line()? {
                trace!("Received line {:?}", line);
                lines.push(line);
                last_line = Instant::now();
                continue;
            }

            let idle_expired = last_line.elapsed() >= timeout;
            let limit_expired = limit.map_or(false, |l| start.elapsed() >= l);

            if idle_expired || limit_expired {
                warn!(
                    "Received {} of {} expected lines before timing out",
                    lines.len(), expected_lines
                );
                break;
            }

            thread::sleep(self.options.poll_interval());
        }

        Ok(lines)
    }

    /// Send `payload` and receive up to `expected_lines` reply lines.
    pub fn request(&mut self, payload: &str, expected_lines: usize) -> Result<Vec<String>, LinkError> {
        self.send(payload)?;
        self.receive(expected_lines)
    }

    /// Encode and send a command, receiving up to `expected_lines` reply lines.
    pub fn request_command(
        &mut self,
        command: &DeviceCommand,
        expected_lines: usize
    ) -> Result<DeviceReply, LinkError> {
        let lines = self.request(&command.encode(), expected_lines)?;
        Ok(DeviceReply::new(lines))
    }

    /// Release the connection. Closing an already closed link does nothing.
    pub fn close(&mut self) {
        if let Some(mut io) = self.io.take() {
            if let Err(e) = io.flush() {
                warn!("Could not flush the arm link before closing: {}", e);
            }
            info!("Arm controller link closed");
        }

        self.rx_buf.clear();
        self.state = LinkState::Closed;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    pub fn timeout(&self) -> Duration {
        self.options.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.options.timeout_s = timeout.as_secs_f64();
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    fn ensure_ready(&self) -> Result<(), LinkError> {
        match self.state {
            LinkState::Ready => Ok(()),
            s => Err(LinkError::NotReady(s)),
        }
    }

    /// Poll incoming lines until one contains `token`, ignoring all others.
    fn wait_for(&mut self, token: &str, stage: LinkStage) -> Result<(), LinkError> {
        let timeout = self.options.timeout();
        let start = Instant::now();

        loop {
            while let Some(line) = self.poll_line()? {
                if line.contains(token) {
                    return Ok(());
                }
                debug!("Ignoring line from arm controller: {:?}", line);
            }

            if start.elapsed() >= timeout {
                return Err(LinkError::Timeout(stage, timeout));
            }

            thread::sleep(self.options.poll_interval());
        }
    }

    /// Return the next complete line, reading any waiting bytes first if none is buffered.
    fn poll_line(&mut self) -> Result<Option<String>, LinkError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        self.fill_rx_buf()?;

        Ok(self.take_line())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.rx_buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.rx_buf.drain(..=end).collect();

        Some(String::from_utf8_lossy(&raw).trim_end().to_string())
    }

    fn fill_rx_buf(&mut self) -> Result<(), LinkError> {
        let io = self.io.as_mut().ok_or(LinkError::NotReady(LinkState::Closed))?;

        let waiting = io.bytes_waiting().map_err(LinkError::Io)?;
        if waiting == 0 {
            return Ok(());
        }

        let mut buf = [0u8; RX_CHUNK_SIZE];
        let len = waiting.min(RX_CHUNK_SIZE);

        match io.read(&mut buf[..len]) {
            Ok(n) => self.rx_buf.extend_from_slice(&buf[..n]),
            Err(e) if is_transient(&e) => (),
            Err(e) => return Err(LinkError::Io(e)),
        }

        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let io = self.io.as_mut().ok_or(LinkError::NotReady(LinkState::Closed))?;

        io.write_all(bytes).map_err(LinkError::Io)?;
        io.flush().map_err(LinkError::Io)
    }
}

impl<T: SerialIo> Drop for DeviceLink<T> {
    fn drop(&mut self) {
        self.close();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that a payload can be carried by a single frame.
pub fn validate_payload(payload: &str) -> Result<(), LinkError> {
    if payload.bytes().any(|b| b == FRAME_START || b == FRAME_END) {
        return Err(LinkError::InvalidPayload(payload.to_string(), "contains a frame marker"));
    }
    if !payload.is_ascii() {
        return Err(LinkError::InvalidPayload(payload.to_string(), "is not ASCII"));
    }
    if payload.len() >= MAX_FRAME_CHARS {
        return Err(LinkError::InvalidPayload(
            payload.to_string(),
            "is longer than the board's receive buffer"
        ));
    }

    Ok(())
}

fn open_port(path: &str, options: &LinkOptions) -> Result<SerialPortIo, LinkError> {
    info!("Opening arm controller serial port {} at {} baud", path, options.baud_rate);

    serialport::new(path, options.baud_rate)
        .timeout(options.poll_interval())
        .open()
        .map_err(|e| LinkError::Open(path.to_string(), e))
}

fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

#[cfg(test)]
mod test {
    use super::sim::{SimConfig, SimDevice};
    use super::*;

    fn fast_options() -> LinkOptions {
        LinkOptions {
            timeout_s: 0.15,
            poll_interval_s: 0.005,
            ..Default::default()
        }
    }

    fn ready_link(device: &SimDevice) -> DeviceLink<sim::SimPort> {
        match DeviceLink::connect(device.port(), fast_options()) {
            Ok(l) => l,
            Err((_, e)) => panic!("handshake failed: {}", e),
        }
    }

    #[test]
    fn test_handshake() {
        let device = SimDevice::new(SimConfig::default());
        device.push_line("booting...");

        let link = ready_link(&device);
        assert_eq!(link.state(), LinkState::Ready);
    }

    #[test]
    fn test_handshake_timeout_leaves_link_open() {
        let device = SimDevice::new(SimConfig {
            announce_setup: false,
            ..Default::default()
        });

        let (mut link, err) = match DeviceLink::connect(device.port(), fast_options()) {
            Ok(_) => panic!("handshake should have timed out"),
            Err(e) => e,
        };

        assert!(err.is_timeout());
        assert!(matches!(err, LinkError::Timeout(LinkStage::Handshake, _)));
        assert_eq!(link.state(), LinkState::HandshakeWait);
        assert!(device.is_connected());
        assert!(matches!(link.send("stop"), Err(LinkError::NotReady(LinkState::HandshakeWait))));

        link.close();
        assert!(!device.is_connected());
    }

    #[test]
    fn test_request_round_trip() {
        let device = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&device);

        device.queue_reply(&["1"]);
        let reply = link
            .request_command(&DeviceCommand::Set(vec![0.0, 15.0, 60.0, 105.0, 0.0, 0.0]), 1)
            .unwrap();

        assert_eq!(reply.flag(), Ok(true));
        assert_eq!(device.frames(), vec!["set:0.00,15.00,60.00,105.00,0.00,0.00".to_string()]);
        assert_eq!(device.received_bytes(), b"<set:0.00,15.00,60.00,105.00,0.00,0.00>".to_vec());
    }

    #[test]
    fn test_send_without_ready_writes_no_payload() {
        let device = SimDevice::new(SimConfig {
            acknowledge_frames: false,
            ..Default::default()
        });
        let mut link = ready_link(&device);

        let res = link.send("set:0.00,90.00,0.00,90.00,0.00,0.00");

        assert!(matches!(res, Err(LinkError::Timeout(LinkStage::SendReady, _))));
        assert_eq!(device.received_bytes(), vec![FRAME_START]);
        assert!(device.frames().is_empty());
    }

    #[test]
    fn test_receive_partial_on_idle_timeout() {
        let device = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&device);

        device.push_line("line 1");
        device.push_line("line 2");

        let start = Instant::now();
        let lines = link.receive(3).unwrap();

        assert_eq!(lines, vec!["line 1".to_string(), "line 2".to_string()]);
        assert!(start.elapsed() >= link.timeout());
    }

    #[test]
    fn test_receive_ignores_partial_line() {
        let device = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&device);

        device.push_bytes(b"1\r\n0 incompl");

        assert_eq!(link.receive(2).unwrap(), vec!["1".to_string()]);

        device.push_bytes(b"ete\n");
        assert_eq!(link.receive(1).unwrap(), vec!["0 incomplete".to_string()]);
    }

    #[test]
    fn test_receive_limit() {
        let device = SimDevice::new(SimConfig::default());
        let mut options = fast_options();
        options.timeout_s = 5.0;
        options.receive_limit_s = Some(0.05);

        let mut link = match DeviceLink::connect(device.port(), options) {
            Ok(l) => l,
            Err((_, e)) => panic!("handshake failed: {}", e),
        };

        let start = Instant::now();
        assert!(link.receive(1).unwrap().is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_payloads() {
        let device = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&device);

        assert!(matches!(link.send("set:<1>"), Err(LinkError::InvalidPayload(..))));
        assert!(matches!(
            link.send(&"9".repeat(MAX_FRAME_CHARS)),
            Err(LinkError::InvalidPayload(..))
        ));

        assert!(device.received_bytes().is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let device = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&device);

        link.close();
        link.close();

        assert_eq!(link.state(), LinkState::Closed);
        assert!(!device.is_connected());
        assert!(matches!(link.receive(1), Err(LinkError::NotReady(LinkState::Closed))));
    }

    #[test]
    fn test_reconnect_after_close() {
        let first = SimDevice::new(SimConfig::default());
        let mut link = ready_link(&first);
        link.close();

        let second = SimDevice::new(SimConfig::default());
        link.reconnect(second.port()).unwrap();
        assert!(link.is_ready());
        assert!(second.is_connected());

        link.request("stop", 1).unwrap();
        assert!(first.frames().is_empty());
        assert_eq!(second.frames(), vec!["stop".to_string()]);

        // Reconnecting a live link closes its current connection first
        let silent = SimDevice::new(SimConfig {
            announce_setup: false,
            ..Default::default()
        });
        let res = link.reconnect(silent.port());
        assert!(matches!(res, Err(LinkError::Timeout(LinkStage::Handshake, _))));
        assert!(!second.is_connected());
        assert!(silent.is_connected());
        assert_eq!(link.state(), LinkState::HandshakeWait);
    }

    #[cfg(unix)]
    #[test]
    fn test_reopen_needs_port_path() {
        let (_master, slave) = serialport::TTYPort::pair().unwrap();
        let mut link: DeviceLink<SerialPortIo> = DeviceLink::new(Box::new(slave), fast_options());

        assert!(matches!(link.reopen(), Err(LinkError::NoPortPath)));
        assert_eq!(link.state(), LinkState::HandshakeWait);

        link.port_path = Some("/dev/imagebot-no-such-port".to_string());
        assert!(matches!(link.reopen(), Err(LinkError::Open(..))));
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn test_set_timeout() {
        let device = SimDevice::new(SimConfig {
            announce_setup: false,
            ..Default::default()
        });
        let mut options = fast_options();
        options.timeout_s = 5.0;

        let mut link = DeviceLink::new(device.port(), options);
        link.set_timeout(Duration::from_millis(50));
        assert!((link.timeout().as_secs_f64() - 0.05).abs() < 1e-9);

        // The handshake window follows the new timeout
        let start = Instant::now();
        assert!(matches!(link.handshake(), Err(LinkError::Timeout(LinkStage::Handshake, _))));
        assert!(start.elapsed() < Duration::from_secs(1));

        // As does the receive idle window
        device.push_line(SETUP_COMPLETE_TOKEN);
        link.handshake().unwrap();

        let start = Instant::now();
        assert!(link.receive(1).unwrap().is_empty());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(1));
    }
}
