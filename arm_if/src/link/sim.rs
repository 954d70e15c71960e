//! # Simulated Arm Controller Board
//!
//! Implements the board side of the framing protocol in memory. A [`SimDevice`] is the board
//! itself and can be inspected from any thread, [`SimDevice::port`] connects to it and returns a
//! [`SimPort`] which a [`DeviceLink`](super::DeviceLink) can own.
//!
//! Board behaviour:
//! - prints `setup complete` when a port connects (if `announce_setup` is set),
//! - prints `ready` on a start byte outside a frame (if `acknowledge_frames` is set),
//! - buffers payload characters up to its receive buffer size,
//! - on an end byte records the frame and prints the next queued reply, or the default reply,
//! - ignores whitespace outside a frame and warns about any other stray character.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use log::trace;

use super::{SerialIo, FRAME_END, FRAME_START, MAX_FRAME_CHARS, READY_TOKEN, SETUP_COMPLETE_TOKEN};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Behaviour of a simulated board.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Print `setup complete` when a port connects.
    pub announce_setup: bool,

    /// Print `ready` when a frame starts.
    pub acknowledge_frames: bool,

    /// Reply printed for a frame when no reply has been queued.
    pub default_reply: Vec<String>,
}

/// A simulated board, cheap to clone, all clones refer to the same board.
#[derive(Clone)]
pub struct SimDevice {
    inner: Arc<Mutex<SimInner>>,
}

/// A connection to a [`SimDevice`]. Dropping it disconnects.
pub struct SimPort {
    inner: Arc<Mutex<SimInner>>,
}

struct SimInner {
    config: SimConfig,

    /// Bytes the board has printed which the host has not read yet
    to_host: VecDeque<u8>,

    /// Every byte the host has written
    from_host: Vec<u8>,

    receiving: bool,

    payload: String,

    frames: Vec<String>,

    replies: VecDeque<Vec<String>>,

    /// Number of live ports
    connections: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            announce_setup: true,
            acknowledge_frames: true,
            default_reply: vec!["1".to_string()],
        }
    }
}

impl SimDevice {
    pub fn new(config: SimConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimInner {
                config,
                to_host: VecDeque::new(),
                from_host: Vec::new(),
                receiving: false,
                payload: String::new(),
                frames: Vec::new(),
                replies: VecDeque::new(),
                connections: 0,
            })),
        }
    }

    /// Connect to the board.
    pub fn port(&self) -> SimPort {
        let mut inner = self.lock();
        inner.connections += 1;
        if inner.config.announce_setup {
            inner.println(SETUP_COMPLETE_TOKEN);
        }

        SimPort {
            inner: self.inner.clone(),
        }
    }

    /// Queue the reply lines for the next completed frame. An empty reply makes the board stay
    /// silent for that frame.
    pub fn queue_reply(&self, lines: &[&str]) {
        self.lock()
            .replies
            .push_back(lines.iter().map(|l| l.to_string()).collect());
    }

    /// Make the board print a line.
    pub fn push_line(&self, line: &str) {
        self.lock().println(line);
    }

    /// Make the board print raw bytes.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.lock().to_host.extend(bytes.iter().copied());
    }

    /// Payloads of all complete frames received so far.
    pub fn frames(&self) -> Vec<String> {
        self.lock().frames.clone()
    }

    /// Every byte written by the host so far.
    pub fn received_bytes(&self) -> Vec<u8> {
        self.lock().from_host.clone()
    }

    /// True while any [`SimPort`] is connected.
    pub fn is_connected(&self) -> bool {
        self.lock().connections > 0
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        lock(&self.inner)
    }
}

impl SimInner {
    fn println(&mut self, line: &str) {
        self.to_host.extend(line.bytes());
        self.to_host.extend(b"\r\n".iter().copied());
    }

    fn process(&mut self, byte: u8) {
        self.from_host.push(byte);

        if self.receiving {
            if byte == FRAME_END {
                self.receiving = false;
                let payload = std::mem::take(&mut self.payload);
                trace!("Simulated board received frame {:?}", payload);
                self.frames.push(payload);

                let reply = self
                    .replies
                    .pop_front()
                    .unwrap_or_else(|| self.config.default_reply.clone());
                for line in reply {
                    self.println(&line);
                }
            }
            else if self.payload.len() < MAX_FRAME_CHARS - 1 {
                self.payload.push(byte as char);
            }
            else {
                self.println("ERROR: Send message is longer than the maximum length!");
            }
        }
        else if byte == FRAME_START {
            self.receiving = true;
            if self.config.acknowledge_frames {
                self.println(READY_TOKEN);
            }
        }
        else if !(byte as char).is_ascii_whitespace() {
            self.println(
                "WARNING: Received char but without any start message statement! Cannot process message..."
            );
        }
    }
}

impl Read for SimPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = lock(&self.inner);

        if inner.to_host.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data from simulated board"));
        }

        let n = buf.len().min(inner.to_host.len());
        for (dst, src) in buf.iter_mut().zip(inner.to_host.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }
}

impl Write for SimPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = lock(&self.inner);
        for &b in buf {
            inner.process(b);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialIo for SimPort {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(lock(&self.inner).to_host.len())
    }
}

impl Drop for SimPort {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        inner.connections = inner.connections.saturating_sub(1);
    }
}

fn lock(inner: &Mutex<SimInner>) -> MutexGuard<'_, SimInner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_board_framing() {
        let device = SimDevice::new(SimConfig::default());
        let mut port = device.port();

        port.write_all(b" x<stop>").unwrap();

        let mut buf = [0u8; 256];
        let n = port.read(&mut buf).unwrap();
        let out = String::from_utf8_lossy(&buf[..n]).to_string();

        assert_eq!(
            out,
            "setup complete\r\n\
             WARNING: Received char but without any start message statement! Cannot process message...\r\n\
             ready\r\n\
             1\r\n"
        );
        assert_eq!(device.frames(), vec!["stop".to_string()]);
    }

    #[test]
    fn test_queued_replies() {
        let device = SimDevice::new(SimConfig {
            announce_setup: false,
            ..Default::default()
        });
        let mut port = device.port();

        device.queue_reply(&["0"]);
        device.queue_reply(&[]);
        port.write_all(b"<a><b><c>").unwrap();

        let mut buf = [0u8; 64];
        let n = port.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ready\r\n0\r\nready\r\nready\r\n1\r\n");
        assert!(port.read(&mut buf).is_err());
    }
}
