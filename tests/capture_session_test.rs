//! End-to-end tests for the framer → translator → writer pipeline, driven
//! through the mock serial line.

use m64_capture::framer::{FramerState, PacketFramer};
use m64_capture::hardware::mock;
use m64_capture::movie::{
    read_movie, FrameCountPatch, MovieHeader, MovieSink, MovieWriter, WriterState, HEADER_SIZE,
};
use m64_capture::namer::SessionNamer;
use m64_capture::session::{CaptureSession, StopReason, TickOutcome};
use m64_capture::translate::translate;
use m64_capture::{CaptureError, RawSample};
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::time::Duration;
use tempfile::tempdir;
use tracing_test::traced_test;

fn new_session(
    dir: &std::path::Path,
    patch: FrameCountPatch,
) -> (CaptureSession<mock::MockSampleSource>, mock::MockLineHandle) {
    let path = SessionNamer::new().next_path(dir.join("movies"), "test").unwrap();
    let writer = MovieWriter::create(&path, &MovieHeader::default().with_uid(99), patch).unwrap();
    let (source, line) = mock::new();
    (CaptureSession::new(PacketFramer::new(source), writer), line)
}

/// In-memory movie that refuses writes past `limit` bytes, like a full disk.
struct FullDisk {
    data: Cursor<Vec<u8>>,
    limit: u64,
}

impl FullDisk {
    fn after_records(records: u64) -> Self {
        Self {
            data: Cursor::new(Vec::new()),
            limit: HEADER_SIZE as u64 + 4 * records,
        }
    }
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.data.position() >= self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
        }
        self.data.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FullDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl MovieSink for FullDisk {}

#[test]
fn manual_ticks_record_only_fresh_samples() {
    let dir = tempdir().unwrap();
    let (mut session, line) = new_session(dir.path(), FrameCountPatch::Corrected);
    session.start().unwrap();

    // Three samples arrive between ticks; only the first is kept.
    line.feed(&[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    assert_eq!(
        session.tick().unwrap(),
        TickOutcome::Recorded(RawSample::new([1, 1, 1, 1]))
    );
    assert_eq!(session.tick().unwrap(), TickOutcome::Idle);

    line.feed(&[4, 4, 4, 4]);
    session.tick().unwrap();

    let summary = session.finish(StopReason::Requested).unwrap();
    assert_eq!(summary.samples_written, 2);
    assert_eq!(summary.discarded_bytes, 8);

    let movie = read_movie(&summary.path).unwrap();
    assert_eq!(
        movie.samples,
        vec![RawSample::new([1, 1, 1, 1]), RawSample::new([4, 4, 4, 4])]
    );
    assert_eq!(movie.header.frame_count, 2);
}

#[test]
fn disconnect_stops_framer_and_keeps_partial_movie() {
    let dir = tempdir().unwrap();
    let (mut session, line) = new_session(dir.path(), FrameCountPatch::Legacy);
    session.start().unwrap();

    line.feed(&[5, 6, 7, 8]);
    session.tick().unwrap();

    line.unplug();
    assert_eq!(session.tick().unwrap(), TickOutcome::Disconnected);
    assert_eq!(session.framer().state(), FramerState::Stopped);
    assert!(line.is_released());

    // Later ticks are no-ops and the disconnect is not reported again.
    assert_eq!(session.tick().unwrap(), TickOutcome::Inactive);
    assert_eq!(session.tick().unwrap(), TickOutcome::Inactive);

    let summary = session.finish(StopReason::Disconnected).unwrap();
    let bytes = std::fs::read(&summary.path).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 4);
    assert_eq!(&bytes[HEADER_SIZE..], &[5, 6, 7, 8]);
}

#[tokio::test]
#[traced_test]
async fn run_ends_on_disconnect_and_closes_everything() {
    let dir = tempdir().unwrap();
    let (session, line) = new_session(dir.path(), FrameCountPatch::Corrected);
    let mut session = session.with_poll_interval(Duration::from_millis(1));
    let mut states = session.subscribe();

    let device = line.clone();
    let feeder = async move {
        for i in 0..3u8 {
            device.feed(&[i, 0, 0xAA, 0x55]);
            while device.buffered() > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        device.unplug();
    };

    let (summary, ()) = tokio::join!(session.run(std::future::pending::<()>()), feeder);
    let summary = summary.unwrap();

    assert_eq!(summary.reason, StopReason::Disconnected);
    assert_eq!(summary.samples_written, 3);
    assert!(line.is_released());
    assert!(logs_contain("Connection lost"));

    for i in 0..3u8 {
        let state = states.recv().await.unwrap();
        assert_eq!(state, translate(RawSample::new([i, 0, 0xAA, 0x55])));
    }

    let movie = read_movie(&summary.path).unwrap();
    assert_eq!(movie.header.frame_count, 3);
    assert_eq!(movie.samples.len(), 3);
}

#[tokio::test]
async fn run_stops_when_shutdown_resolves() {
    let dir = tempdir().unwrap();
    let (session, line) = new_session(dir.path(), FrameCountPatch::Legacy);
    line.feed(&[1, 2, 3, 4]);

    let mut session = session.with_poll_interval(Duration::from_millis(1));
    let summary = session
        .run(tokio::time::sleep(Duration::from_millis(30)))
        .await
        .unwrap();

    assert_eq!(summary.reason, StopReason::Requested);
    assert_eq!(summary.samples_written, 1);
    assert!(line.is_released());
    assert_eq!(
        std::fs::metadata(&summary.path).unwrap().len(),
        (HEADER_SIZE + 4) as u64
    );
}

#[tokio::test]
#[traced_test]
async fn run_returns_write_error_after_releasing_port_and_file() {
    let writer = MovieWriter::from_sink(
        FullDisk::after_records(1),
        "full.m64",
        &MovieHeader::default(),
        FrameCountPatch::Corrected,
    )
    .unwrap();
    let (source, line) = mock::new();
    let mut session = CaptureSession::new(PacketFramer::new(source), writer)
        .with_poll_interval(Duration::from_millis(1));

    let device = line.clone();
    let feeder = async move {
        for i in 0..2u8 {
            device.feed(&[i, i, i, i]);
            while device.buffered() > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    };

    let (result, ()) = tokio::join!(session.run(std::future::pending::<()>()), feeder);

    assert!(matches!(result, Err(CaptureError::Io(_))));
    assert!(line.is_released());
    assert_eq!(session.framer().state(), FramerState::Stopped);
    assert_eq!(session.writer().state(), WriterState::Closed);
    assert_eq!(session.writer().samples_written(), 1);
    assert!(logs_contain("Recording failed"));
}

#[test]
fn consecutive_sessions_get_distinct_paths() {
    let dir = tempdir().unwrap();
    let mut namer = SessionNamer::new();

    let mut previous = None;
    for _ in 0..3 {
        let path = namer.next_path(dir.path(), "run").unwrap();
        assert!(!path.exists());
        let mut writer =
            MovieWriter::create(&path, &MovieHeader::default(), FrameCountPatch::Legacy).unwrap();
        writer.close().unwrap();
        if let Some(prev) = previous {
            assert!(path > prev);
        }
        previous = Some(path);
    }
}
