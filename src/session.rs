//! Recording session: the periodic callback that ties the pipeline together.
//!
//! Each tick runs, synchronously and in order:
//!
//! 1. [`PacketFramer::poll`] for at most one fresh sample,
//! 2. [`translate`] into a [`ControllerState`], broadcast to subscribers
//!    (display, diagnostics),
//! 3. [`MovieWriter::append_sample`] with the *raw* sample.
//!
//! [`CaptureSession::run`] drives ticks from a `tokio::time::interval` on the
//! caller's task until the shutdown future resolves or the device disconnects.
//! Nothing is spawned, so the connection and the file are only ever touched
//! from that one task. Whatever ends the loop, the framer is stopped and the
//! writer closed before `run` returns.

use crate::error::AppResult;
use crate::framer::{PacketFramer, PollOutcome};
use crate::hardware::SampleSource;
use crate::movie::{MovieSink, MovieWriter};
use crate::sample::{ControllerState, RawSample, POLL_INTERVAL};
use crate::translate::translate;
use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Capacity of the controller-state broadcast channel. Slow subscribers lag
/// and skip states; the recording is unaffected.
const STATE_CHANNEL_CAPACITY: usize = 256;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A sample was translated and recorded.
    Recorded(RawSample),
    /// No complete sample was buffered.
    Idle,
    /// The framer is not running.
    Inactive,
    /// The device disconnected during this tick.
    Disconnected,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future resolved.
    Requested,
    /// The device went away.
    Disconnected,
}

/// Summary returned when a session finishes normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Movie file that was written
    pub path: PathBuf,
    /// Samples recorded into the movie
    pub samples_written: u32,
    /// Backlog bytes dropped by the framer
    pub discarded_bytes: u64,
    /// What ended the session
    pub reason: StopReason,
}

/// One continuous recording from file creation to close.
pub struct CaptureSession<S: SampleSource, W: MovieSink = File> {
    framer: PacketFramer<S>,
    writer: MovieWriter<W>,
    states: broadcast::Sender<ControllerState>,
    poll_interval: Duration,
}

impl<S: SampleSource, W: MovieSink> CaptureSession<S, W> {
    /// Pair a framer with an open movie writer.
    pub fn new(framer: PacketFramer<S>, writer: MovieWriter<W>) -> Self {
        let (states, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            framer,
            writer,
            states,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the tick period. Only meant for tests and simulations; the
    /// adapter protocol expects [`POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Receive every translated controller state.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerState> {
        self.states.subscribe()
    }

    /// The framer driving this session.
    pub fn framer(&self) -> &PacketFramer<S> {
        &self.framer
    }

    /// The writer owning the movie file.
    pub fn writer(&self) -> &MovieWriter<W> {
        &self.writer
    }

    /// Start the framer. Called by [`run`](Self::run); exposed for callers
    /// that drive [`tick`](Self::tick) themselves.
    pub fn start(&mut self) -> AppResult<()> {
        self.framer.start()
    }

    /// Run one poll → translate → append cycle.
    ///
    /// # Errors
    /// Output-file failures. They are fatal; the caller should
    /// [`finish`](Self::finish) the session.
    pub fn tick(&mut self) -> AppResult<TickOutcome> {
        match self.framer.poll() {
            PollOutcome::Sample(raw) => {
                let state = translate(raw);
                // No subscribers is fine.
                let _ = self.states.send(state);
                self.writer.append_sample(raw)?;
                Ok(TickOutcome::Recorded(raw))
            }
            PollOutcome::Pending => Ok(TickOutcome::Idle),
            PollOutcome::Inactive => Ok(TickOutcome::Inactive),
            PollOutcome::Disconnected => Ok(TickOutcome::Disconnected),
        }
    }

    /// Stop the framer and close the movie. Idempotent.
    pub fn finish(&mut self, reason: StopReason) -> AppResult<SessionSummary> {
        self.framer.stop();
        self.writer.close()?;

        let summary = SessionSummary {
            path: self.writer.path().to_path_buf(),
            samples_written: self.writer.samples_written(),
            discarded_bytes: self.framer.stats().discarded_bytes,
            reason,
        };
        info!(
            path = %summary.path.display(),
            samples = summary.samples_written,
            discarded_bytes = summary.discarded_bytes,
            reason = ?summary.reason,
            "Capture session finished"
        );
        Ok(summary)
    }

    /// Tick on the poll cadence until `shutdown` resolves or the device
    /// disconnects, then finish the session.
    ///
    /// # Errors
    /// A write failure ends the session early and is returned after the
    /// framer has been stopped and the file released.
    pub async fn run<F>(&mut self, shutdown: F) -> AppResult<SessionSummary>
    where
        F: Future<Output = ()>,
    {
        if let Err(err) = self.start() {
            self.framer.stop();
            if let Err(close_err) = self.writer.close() {
                warn!(error = %close_err, "Failed to close movie after start error");
            }
            return Err(err);
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(StopReason::Requested),
                // The loop holds the framer exclusively, so once started it
                // only leaves Running through a reported disconnect. Inactive
                // cannot follow without one and is treated the same way.
                _ = ticker.tick() => match self.tick() {
                    Ok(TickOutcome::Disconnected | TickOutcome::Inactive) => {
                        warn!("Controller adapter disconnected");
                        break Ok(StopReason::Disconnected);
                    }
                    Ok(_) => {}
                    Err(err) => break Err(err),
                },
            }
        };

        match outcome {
            Ok(reason) => self.finish(reason),
            Err(err) => {
                error!(error = %err, "Recording failed, closing session");
                self.framer.stop();
                if let Err(close_err) = self.writer.close() {
                    warn!(error = %close_err, "Failed to close movie after write error");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FramerState;
    use crate::hardware::mock;
    use crate::movie::{read_movie, FrameCountPatch, MovieHeader, WriterState};
    use tempfile::tempdir;

    fn session(
        dir: &std::path::Path,
    ) -> (CaptureSession<mock::MockSampleSource>, mock::MockLineHandle) {
        let (source, line) = mock::new();
        let writer = MovieWriter::create(
            dir.join("s.m64"),
            &MovieHeader::default(),
            FrameCountPatch::Corrected,
        )
        .unwrap();
        (CaptureSession::new(PacketFramer::new(source), writer), line)
    }

    #[test]
    fn tick_records_raw_bytes_and_broadcasts_translation() {
        let dir = tempdir().unwrap();
        let (mut session, line) = session(dir.path());
        let mut states = session.subscribe();
        session.start().unwrap();

        line.feed(&[0xFF, 0x00, 0xAA, 0x55]);
        let outcome = session.tick().unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Recorded(RawSample::new([0xFF, 0x00, 0xAA, 0x55]))
        );
        let state = states.try_recv().unwrap();
        assert_eq!(state, translate(RawSample::new([0xFF, 0x00, 0xAA, 0x55])));
        assert_eq!(session.writer().samples_written(), 1);
    }

    #[test]
    fn tick_without_full_sample_writes_nothing() {
        let dir = tempdir().unwrap();
        let (mut session, line) = session(dir.path());
        session.start().unwrap();

        line.feed(&[1, 2]);
        assert_eq!(session.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(session.writer().samples_written(), 0);
    }

    #[test]
    fn finish_releases_port_and_file() {
        let dir = tempdir().unwrap();
        let (mut session, line) = session(dir.path());
        session.start().unwrap();
        line.feed(&[1, 2, 3, 4]);
        session.tick().unwrap();

        let summary = session.finish(StopReason::Requested).unwrap();
        assert_eq!(summary.samples_written, 1);
        assert!(line.is_released());
        assert_eq!(session.writer().state(), WriterState::Closed);
        assert_eq!(session.framer().state(), FramerState::Stopped);

        // second finish is harmless
        session.finish(StopReason::Requested).unwrap();

        let movie = read_movie(&summary.path).unwrap();
        assert_eq!(movie.header.frame_count, 1);
        assert_eq!(movie.samples, vec![RawSample::new([1, 2, 3, 4])]);
    }

    #[tokio::test]
    async fn run_on_stopped_framer_fails_and_closes_movie() {
        let dir = tempdir().unwrap();
        let (source, line) = mock::new();
        let mut framer = PacketFramer::new(source);
        framer.start().unwrap();
        framer.stop();
        let writer = MovieWriter::create(
            dir.path().join("s.m64"),
            &MovieHeader::default(),
            FrameCountPatch::Legacy,
        )
        .unwrap();
        let mut session = CaptureSession::new(framer, writer);

        let err = session.run(std::future::pending::<()>()).await.unwrap_err();

        assert!(err.is_contract_violation());
        assert!(line.is_released());
        assert_eq!(session.writer().state(), WriterState::Closed);
    }
}
