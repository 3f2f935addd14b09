//! Tests for streaming functionality.
//!
//! Shared test doubles for the three collaborator seams live here; the
//! sibling files exercise the buffer, the error types, the connectivity
//! monitor, the transmitter state machine and the assembled pipeline.

use super::error::{StreamError, StreamResult};
use super::link::{LinkEvent, LinkEventSender};
use super::traits::{Connection, NetworkInterface, SampleSource, Transport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

mod stream_tests;

/// Raw source returning a fixed value and counting reads.
#[derive(Clone)]
pub(crate) struct CountingSource {
    pub value: u16,
    pub reads: Arc<AtomicU64>,
}

impl CountingSource {
    pub fn new(value: u16) -> Self {
        Self {
            value,
            reads: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl SampleSource for CountingSource {
    fn read_raw_sample(&mut self) -> StreamResult<u16> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.value)
    }
}

/// Raw source replaying a script of readings, then repeating the last entry.
pub(crate) struct ScriptedSource {
    script: VecDeque<StreamResult<u16>>,
    last: u16,
}

impl ScriptedSource {
    pub fn new(script: Vec<StreamResult<u16>>) -> Self {
        Self {
            script: script.into(),
            last: 0,
        }
    }
}

impl SampleSource for ScriptedSource {
    fn read_raw_sample(&mut self) -> StreamResult<u16> {
        match self.script.pop_front() {
            Some(Ok(raw)) => {
                self.last = raw;
                Ok(raw)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last),
        }
    }
}

/// Raw source whose first read panics.
pub(crate) struct PanickingSource;

impl SampleSource for PanickingSource {
    fn read_raw_sample(&mut self) -> StreamResult<u16> {
        panic!("converter driver crashed");
    }
}

/// How the mock transport answers one connect or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Succeed,
    Fail,
    Fatal,
    Hang,
}

impl Behavior {
    async fn apply(self, operation: &str) -> StreamResult<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail => Err(StreamError::connection(
                operation,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "scripted failure"),
            )),
            Self::Fatal => Err(StreamError::resource("socket", "scripted exhaustion")),
            Self::Hang => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub(crate) struct MockState {
    pub connect_script: VecDeque<Behavior>,
    pub write_script: VecDeque<Behavior>,
    pub connect_attempts: usize,
    pub endpoints: Vec<String>,
    pub frames: Vec<Vec<u8>>,
    pub closes: usize,
    pub open_connections: usize,
}

/// Transport whose connect and write outcomes follow a script.
///
/// Once a script runs dry every further call uses the fallback behaviour.
#[derive(Clone)]
pub(crate) struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
    pub connect_fallback: Behavior,
    pub write_fallback: Behavior,
}

impl MockTransport {
    pub fn healthy() -> Self {
        Self::with_fallbacks(Behavior::Succeed, Behavior::Succeed)
    }

    pub fn with_fallbacks(connect_fallback: Behavior, write_fallback: Behavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            connect_fallback,
            write_fallback,
        }
    }

    pub fn script_connects(&self, behaviors: &[Behavior]) {
        self.state.lock().connect_script.extend(behaviors.iter().copied());
    }

    pub fn script_writes(&self, behaviors: &[Behavior]) {
        self.state.lock().write_script.extend(behaviors.iter().copied());
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().frames.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().open_connections
    }
}

impl Transport for MockTransport {
    type Conn = MockConnection;

    async fn connect(&self, endpoint: &str) -> StreamResult<MockConnection> {
        let behavior = {
            let mut state = self.state.lock();
            state.connect_attempts += 1;
            state.endpoints.push(endpoint.to_string());
            state
                .connect_script
                .pop_front()
                .unwrap_or(self.connect_fallback)
        };
        behavior.apply("connect").await?;
        self.state.lock().open_connections += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
            write_fallback: self.write_fallback,
        })
    }
}

pub(crate) struct MockConnection {
    state: Arc<Mutex<MockState>>,
    write_fallback: Behavior,
}

impl Connection for MockConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> StreamResult<()> {
        let behavior = self
            .state
            .lock()
            .write_script
            .pop_front()
            .unwrap_or(self.write_fallback);
        behavior.apply("write").await?;
        self.state.lock().frames.push(bytes.to_vec());
        Ok(())
    }

    async fn close(self) {
        let mut state = self.state.lock();
        state.closes += 1;
        state.open_connections -= 1;
    }
}

/// Interface recording association requests, optionally answering them.
#[derive(Clone, Default)]
pub(crate) struct RecordingInterface {
    pub requests: Arc<AtomicUsize>,
    pub auto_associate: bool,
}

impl RecordingInterface {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn responsive() -> Self {
        Self {
            auto_associate: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl NetworkInterface for RecordingInterface {
    fn associate(&self, events: &LinkEventSender) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.auto_associate {
            let _ = events.send(LinkEvent::Associated);
        }
    }
}

/// Decode a little-endian frame back into floats.
pub(crate) fn decode_le(frame: &[u8]) -> Vec<f32> {
    super::wire::decode_frame(frame, super::traits::ByteOrder::LittleEndian)
}
