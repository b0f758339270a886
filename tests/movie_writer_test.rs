//! Integration tests for the movie container writer.

use m64_capture::movie::{
    read_movie, FrameCountPatch, MovieHeader, MovieWriter, WriterState, FRAME_COUNT_OFFSET,
    HEADER_SIZE,
};
use m64_capture::{CaptureError, RawSample};
use tempfile::tempdir;

fn frame_count_field(bytes: &[u8]) -> u32 {
    let at = FRAME_COUNT_OFFSET as usize;
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn record(patch: FrameCountPatch, samples: &[[u8; 4]]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("movie.m64");
    let header = MovieHeader::default().with_uid(42);

    let mut writer = MovieWriter::create(&path, &header, patch).unwrap();
    for bytes in samples {
        writer.append_sample(RawSample::new(*bytes)).unwrap();
    }
    writer.close().unwrap();
    (dir, path)
}

#[test]
fn file_size_is_header_plus_four_bytes_per_sample() {
    for n in [0usize, 1, 5, 300] {
        let samples: Vec<[u8; 4]> = (0..n).map(|i| (i as u32).to_le_bytes()).collect();
        let (_dir, path) = record(FrameCountPatch::Legacy, &samples);

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (HEADER_SIZE + 4 * n) as u64, "n = {n}");
    }
}

#[test]
fn body_holds_raw_bytes_in_order() {
    let samples = [[0xFF, 0x00, 0xAA, 0x55], [0x01, 0x02, 0x03, 0x04]];
    let (_dir, path) = record(FrameCountPatch::Legacy, &samples);

    let movie = read_movie(&path).unwrap();
    assert_eq!(
        movie.samples,
        vec![RawSample::new(samples[0]), RawSample::new(samples[1])]
    );
    assert_eq!(movie.header.uid, 42);
}

#[test]
fn legacy_close_keeps_placeholder_frame_count() {
    let (_dir, path) = record(FrameCountPatch::Legacy, &[[1, 2, 3, 4]; 3]);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(frame_count_field(&bytes), MovieHeader::default().frame_count);
}

#[test]
fn corrected_close_writes_true_frame_count() {
    let (_dir, path) = record(FrameCountPatch::Corrected, &[[1, 2, 3, 4]; 3]);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(frame_count_field(&bytes), 3);
    // patch must not disturb the body or the length
    assert_eq!(bytes.len(), HEADER_SIZE + 12);
    assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &[1, 2, 3, 4]);
}

#[test]
fn corrected_close_with_no_samples_writes_zero() {
    let (_dir, path) = record(FrameCountPatch::Corrected, &[]);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(frame_count_field(&bytes), 0);
}

#[test]
fn both_patch_modes_agree_outside_frame_count() {
    let samples = [[9, 8, 7, 6]; 4];
    let (_a, legacy) = record(FrameCountPatch::Legacy, &samples);
    let (_b, corrected) = record(FrameCountPatch::Corrected, &samples);

    let legacy = std::fs::read(legacy).unwrap();
    let corrected = std::fs::read(corrected).unwrap();
    assert_eq!(legacy[..12], corrected[..12]);
    assert_eq!(legacy[16..], corrected[16..]);
}

#[test]
fn existing_file_is_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("movie.m64");
    std::fs::write(&path, vec![0xEE; 5000]).unwrap();

    let mut writer =
        MovieWriter::create(&path, &MovieHeader::default(), FrameCountPatch::Legacy).unwrap();
    writer.close().unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
}

#[test]
fn append_after_close_is_a_contract_violation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("movie.m64");
    let mut writer =
        MovieWriter::create(&path, &MovieHeader::default(), FrameCountPatch::Legacy).unwrap();

    writer.append_sample(RawSample::new([1, 1, 1, 1])).unwrap();
    writer.close().unwrap();
    writer.close().unwrap();
    assert_eq!(writer.state(), WriterState::Closed);

    let err = writer.append_sample(RawSample::new([2, 2, 2, 2])).unwrap_err();
    assert!(matches!(err, CaptureError::InvalidState { .. }));
    assert!(err.is_contract_violation());

    // The rejected append left the file alone.
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        (HEADER_SIZE + 4) as u64
    );
}

#[test]
fn dropping_a_recording_writer_closes_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("movie.m64");
    {
        let mut writer =
            MovieWriter::create(&path, &MovieHeader::default(), FrameCountPatch::Corrected)
                .unwrap();
        writer.append_sample(RawSample::new([3, 3, 3, 3])).unwrap();
        writer.append_sample(RawSample::new([4, 4, 4, 4])).unwrap();
    }

    let movie = read_movie(&path).unwrap();
    assert_eq!(movie.header.frame_count, 2);
    assert_eq!(movie.samples.len(), 2);
}

#[test]
fn header_bytes_are_deterministic_except_uid_and_frame_count() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a.m64");
    let second = dir.path().join("b.m64");

    let mut a = MovieWriter::create(
        &first,
        &MovieHeader::default().with_uid(1),
        FrameCountPatch::Corrected,
    )
    .unwrap();
    a.append_sample(RawSample::default()).unwrap();
    a.close().unwrap();

    let mut b = MovieWriter::create(
        &second,
        &MovieHeader::default().with_uid(2),
        FrameCountPatch::Corrected,
    )
    .unwrap();
    b.close().unwrap();

    let a = std::fs::read(first).unwrap();
    let b = std::fs::read(second).unwrap();
    assert_eq!(a[..8], b[..8]);
    assert_eq!(a[16..HEADER_SIZE], b[16..HEADER_SIZE]);
}
