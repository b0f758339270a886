//! Packet framing for the controller adapter's serial stream.
//!
//! The adapter streams 4-byte samples continuously. `PacketFramer::poll` is
//! called on a fixed cadence and surfaces at most one sample per call:
//!
//! 1. If fewer than [`SAMPLE_SIZE`] bytes are buffered, nothing is read.
//! 2. Otherwise exactly one sample is read and every byte still buffered is
//!    discarded.
//!
//! Step 2 trades completeness for freshness. When the adapter produces
//! samples faster than the poll cadence, the backlog is dropped and the caller
//! always sees the most recent report instead of replaying stale ones in order.
//! A lossless strategy would need an explicit ring of pending samples here and
//! is not implemented. The number of discarded bytes is tracked in
//! [`FramerStats`] so the loss is observable.
//!
//! Any I/O error from the connection is treated as the device being unplugged:
//! the framer stops, releases the connection, and reports
//! [`PollOutcome::Disconnected`] exactly once.

use crate::error::{AppResult, CaptureError};
use crate::hardware::SampleSource;
use crate::sample::{RawSample, SAMPLE_SIZE};
use tracing::{debug, info, trace, warn};

/// Lifecycle of a framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Constructed, not yet polling.
    Idle,
    /// Polling the connection.
    Running,
    /// Connection released; terminal.
    Stopped,
}

impl FramerState {
    fn describe(self) -> &'static str {
        match self {
            FramerState::Idle => "idle",
            FramerState::Running => "running",
            FramerState::Stopped => "stopped",
        }
    }
}

/// Result of a single [`PacketFramer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The framer is not running; nothing was touched.
    Inactive,
    /// Fewer than a full sample is buffered; nothing was consumed.
    Pending,
    /// A fresh sample was read.
    Sample(RawSample),
    /// The connection failed during this poll. Reported once; the framer is
    /// now stopped.
    Disconnected,
}

/// Counters for one framer lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Samples surfaced through `poll`.
    pub samples: u64,
    /// Backlog bytes thrown away after a read.
    pub discarded_bytes: u64,
}

/// Pulls fixed-size samples from a [`SampleSource`].
pub struct PacketFramer<S: SampleSource> {
    source: Option<S>,
    state: FramerState,
    stats: FramerStats,
}

impl<S: SampleSource> PacketFramer<S> {
    /// Wrap an open connection. The framer owns it until stopped.
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            state: FramerState::Idle,
            stats: FramerStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Begin polling. A no-op when already running.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidState`] once stopped, since the
    /// connection has been released.
    pub fn start(&mut self) -> AppResult<()> {
        match self.state {
            FramerState::Running => Ok(()),
            FramerState::Idle => {
                self.state = FramerState::Running;
                if let Some(source) = &self.source {
                    info!(source = %source.describe(), "Packet framer started");
                }
                Ok(())
            }
            FramerState::Stopped => Err(CaptureError::InvalidState {
                operation: "start framer",
                state: FramerState::Stopped.describe(),
            }),
        }
    }

    /// Stop polling and release the connection. Safe from any state.
    pub fn stop(&mut self) {
        if self.state == FramerState::Stopped {
            return;
        }
        // Dropping the source closes the port.
        if let Some(source) = self.source.take() {
            debug!(source = %source.describe(), "Releasing connection");
        }
        self.state = FramerState::Stopped;
        info!(
            samples = self.stats.samples,
            discarded_bytes = self.stats.discarded_bytes,
            "Packet framer stopped"
        );
    }

    /// Try to pull one sample from the connection.
    pub fn poll(&mut self) -> PollOutcome {
        if self.state != FramerState::Running {
            return PollOutcome::Inactive;
        }
        let Some(source) = self.source.as_mut() else {
            return PollOutcome::Inactive;
        };

        match read_latest(source) {
            Ok(Some((raw, discarded))) => {
                self.stats.samples += 1;
                self.stats.discarded_bytes += discarded as u64;
                trace!(sample = %raw, discarded, "Sample framed");
                PollOutcome::Sample(raw)
            }
            Ok(None) => PollOutcome::Pending,
            Err(err) => {
                warn!(error = %err, "Connection lost, stopping framer");
                self.stop();
                PollOutcome::Disconnected
            }
        }
    }
}

/// One framing step: `None` if a full sample is not yet buffered, otherwise
/// the sample and the number of backlog bytes that were dropped after it.
fn read_latest<S: SampleSource>(source: &mut S) -> std::io::Result<Option<(RawSample, usize)>> {
    let available = source.bytes_to_read()?;
    if available < SAMPLE_SIZE {
        return Ok(None);
    }

    let mut bytes = [0u8; SAMPLE_SIZE];
    source.read_exact(&mut bytes)?;
    let backlog = source.discard_input()?;

    Ok(Some((RawSample::new(bytes), backlog)))
}

impl<S: SampleSource> Drop for PacketFramer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
