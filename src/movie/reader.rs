//! Reading a recorded movie back.

use super::header::{MovieHeader, HEADER_SIZE};
use crate::error::{AppResult, CaptureError};
use crate::sample::{RawSample, SAMPLE_SIZE};
use std::path::Path;

/// A parsed movie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Decoded 1024-byte header.
    pub header: MovieHeader,
    /// Every 4-byte record after the header, in file order.
    pub samples: Vec<RawSample>,
}

/// Load and parse the movie at `path`.
///
/// # Errors
/// I/O failures, a malformed header, or a body that is not a whole number of
/// records.
pub fn read_movie(path: impl AsRef<Path>) -> AppResult<Movie> {
    let bytes = std::fs::read(path.as_ref())?;
    let header = MovieHeader::parse(&bytes)?;

    let body = &bytes[HEADER_SIZE..];
    if body.len() % SAMPLE_SIZE != 0 {
        return Err(CaptureError::MovieFormat(format!(
            "body of {} bytes is not a multiple of {SAMPLE_SIZE}",
            body.len()
        )));
    }

    let samples = body
        .chunks_exact(SAMPLE_SIZE)
        .map(|chunk| RawSample::new([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(Movie { header, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_truncated_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("torn.m64");
        let mut bytes = MovieHeader::default().to_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(read_movie(&path), Err(CaptureError::MovieFormat(_))));
    }

    #[test]
    fn header_only_file_has_no_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.m64");
        std::fs::write(&path, MovieHeader::default().to_bytes()).unwrap();

        let movie = read_movie(&path).unwrap();
        assert!(movie.samples.is_empty());
    }
}
