//! Output path selection for recording sessions.
//!
//! Movies are named `{base}_{NNNN}.m64` with a zero-padded counter. The namer
//! picks the first counter value whose file does not exist yet, and never hands
//! out a counter lower than or equal to one it issued before for the same
//! directory and base name.

use crate::error::AppResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension for movie files.
pub const MOVIE_EXTENSION: &str = "m64";

/// Default output directory, relative to the working directory.
pub const DEFAULT_MOVIE_DIR: &str = "movies";

/// Hands out non-colliding movie paths.
#[derive(Debug, Default)]
pub struct SessionNamer {
    last_issued: HashMap<(PathBuf, String), u32>,
}

impl SessionNamer {
    /// Create a namer with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a path under `dir` for `base` that does not exist yet, creating
    /// `dir` if needed.
    ///
    /// # Errors
    /// Only if `dir` cannot be created.
    pub fn next_path(&mut self, dir: impl AsRef<Path>, base: &str) -> AppResult<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let key = (dir.to_path_buf(), base.to_string());
        let mut suffix = self.last_issued.get(&key).map_or(0, |last| last + 1);

        let path = loop {
            let candidate = dir.join(file_name(base, suffix));
            if !candidate.exists() {
                break candidate;
            }
            suffix += 1;
        };

        debug!(path = %path.display(), suffix, "Selected movie path");
        self.last_issued.insert(key, suffix);
        Ok(path)
    }
}

fn file_name(base: &str, suffix: u32) -> String {
    format!("{base}_{suffix:04}.{MOVIE_EXTENSION}")
}
