//! `.m64` movie container.
//!
//! A movie is a fixed 1024-byte [`MovieHeader`] followed by one 4-byte record
//! per captured sample. Records hold the raw adapter bytes, not the expanded
//! controller state.

pub mod header;
pub mod reader;
pub mod writer;

pub use header::{MovieHeader, FRAME_COUNT_OFFSET, HEADER_SIZE, SIGNATURE};
pub use reader::{read_movie, Movie};
pub use writer::{FrameCountPatch, MovieSink, MovieWriter, WriterState};
