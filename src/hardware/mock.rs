//! Mock serial line for testing the framer without an adapter attached.
//!
//! The mock is split in two halves sharing one in-memory line:
//! - `MockSampleSource` (given to the framer): implements [`SampleSource`]
//! - `MockLineHandle` (kept in the test): feeds bytes, unplugs the device and
//!   inspects what the framer consumed or discarded
//!
//! # Example
//!
//! ```rust
//! use m64_capture::framer::{PacketFramer, PollOutcome};
//! use m64_capture::hardware::mock;
//!
//! let (source, line) = mock::new();
//! let mut framer = PacketFramer::new(source);
//! framer.start().unwrap();
//!
//! line.feed(&[0x01, 0x02]);
//! assert_eq!(framer.poll(), PollOutcome::Pending);
//!
//! line.feed(&[0x03, 0x04]);
//! assert!(matches!(framer.poll(), PollOutcome::Sample(_)));
//! ```

use super::SampleSource;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockLine {
    /// Bytes received from the "device" and not yet read
    rx: VecDeque<u8>,
    /// Total bytes handed out through `read_exact`
    consumed: usize,
    /// Total bytes thrown away through `discard_input`
    discarded: usize,
    /// Bytes that land in `rx` right after the next `read_exact`
    arriving_on_read: Vec<u8>,
    /// When set, every operation fails with this kind
    unplugged: Option<io::ErrorKind>,
    /// Set once the source half has been dropped
    released: bool,
}

/// The framer-facing side of the mock line.
#[derive(Debug)]
pub struct MockSampleSource {
    line: Arc<Mutex<MockLine>>,
}

/// The test-facing side for controlling the mock line.
#[derive(Debug, Clone)]
pub struct MockLineHandle {
    line: Arc<Mutex<MockLine>>,
}

/// Creates a connected pair of `MockSampleSource` and `MockLineHandle`.
pub fn new() -> (MockSampleSource, MockLineHandle) {
    let line = Arc::new(Mutex::new(MockLine::default()));
    (
        MockSampleSource { line: line.clone() },
        MockLineHandle { line },
    )
}

fn lock(line: &Mutex<MockLine>) -> MutexGuard<'_, MockLine> {
    // A panicking test thread must not cascade into unrelated assertions.
    line.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockLine {
    fn check_plugged(&self) -> io::Result<()> {
        match self.unplugged {
            Some(kind) => Err(io::Error::new(kind, "mock device unplugged")),
            None => Ok(()),
        }
    }
}

// =============================================================================
// MockSampleSource Implementations
// =============================================================================

impl SampleSource for MockSampleSource {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let line = lock(&self.line);
        line.check_plugged()?;
        Ok(line.rx.len())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut guard = lock(&self.line);
        let line = &mut *guard;
        line.check_plugged()?;
        let wanted = buf.len();
        if line.rx.len() < wanted {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mock line has fewer bytes than requested",
            ));
        }
        for (slot, byte) in buf.iter_mut().zip(line.rx.drain(..wanted)) {
            *slot = byte;
        }
        line.consumed += wanted;
        let arriving = std::mem::take(&mut line.arriving_on_read);
        line.rx.extend(arriving);
        Ok(())
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        let mut guard = lock(&self.line);
        let line = &mut *guard;
        line.check_plugged()?;
        let dropped = line.rx.len();
        line.discarded += dropped;
        line.rx.clear();
        Ok(dropped)
    }

    fn describe(&self) -> String {
        "MockSampleSource".to_string()
    }
}

impl Drop for MockSampleSource {
    fn drop(&mut self) {
        lock(&self.line).released = true;
    }
}

// =============================================================================
// MockLineHandle Implementations
// =============================================================================

impl MockLineHandle {
    /// Simulates the device sending `data` over the line.
    pub fn feed(&self, data: &[u8]) {
        lock(&self.line).rx.extend(data.iter().copied());
    }

    /// Queues `data` to arrive while the framer is in the middle of its next
    /// read, after it has sized the backlog.
    pub fn feed_during_next_read(&self, data: &[u8]) {
        lock(&self.line).arriving_on_read.extend_from_slice(data);
    }

    /// Simulates the device being unplugged: every later operation on the
    /// source fails with a broken-pipe error.
    pub fn unplug(&self) {
        self.unplug_with(io::ErrorKind::BrokenPipe);
    }

    /// Like [`unplug`](Self::unplug) with a specific error kind.
    pub fn unplug_with(&self, kind: io::ErrorKind) {
        lock(&self.line).unplugged = Some(kind);
    }

    /// Bytes currently waiting to be read.
    pub fn buffered(&self) -> usize {
        lock(&self.line).rx.len()
    }

    /// Total bytes read by the framer.
    pub fn consumed(&self) -> usize {
        lock(&self.line).consumed
    }

    /// Total bytes dropped by `discard_input`.
    pub fn discarded(&self) -> usize {
        lock(&self.line).discarded
    }

    /// Whether the framer has released (dropped) its side of the line.
    pub fn is_released(&self) -> bool {
        lock(&self.line).released
    }
}
