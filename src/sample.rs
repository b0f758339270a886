//! Sample types shared by the framer, the translator and the movie writer.

use std::fmt;
use std::time::Duration;

/// Number of bytes in one raw sample read from the adapter.
pub const SAMPLE_SIZE: usize = 4;

/// Number of slots in the expanded controller state.
pub const STATE_SLOTS: usize = 32;

/// Serial line speed of the controller adapter.
pub const BAUD_RATE: u32 = 115_200;

/// Cadence at which the framer is polled.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One undivided 4-byte reading from the serial device.
///
/// The framer assumes no internal structure; only the translator looks at the
/// individual bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawSample([u8; SAMPLE_SIZE]);

impl RawSample {
    /// Wraps four bytes as a sample.
    pub const fn new(bytes: [u8; SAMPLE_SIZE]) -> Self {
        Self(bytes)
    }

    /// The raw bytes, in wire order.
    pub const fn bytes(&self) -> [u8; SAMPLE_SIZE] {
        self.0
    }
}

impl From<[u8; SAMPLE_SIZE]> for RawSample {
    fn from(bytes: [u8; SAMPLE_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawSample {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Space-separated lowercase hex, e.g. `ff 00 aa 55`.
impl fmt::Display for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:02x} {b:02x} {c:02x} {d:02x}")
    }
}

/// Canonical 32-slot state vector, one slot per logical button or axis
/// direction. Every slot holds 0 or 1.
///
/// Only [`crate::translate::translate`] constructs values of this type, which
/// is what keeps the 0/1 invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerState([u8; STATE_SLOTS]);

impl ControllerState {
    pub(crate) const fn from_slots(slots: [u8; STATE_SLOTS]) -> Self {
        Self(slots)
    }

    /// All 32 slots in order.
    pub const fn slots(&self) -> &[u8; STATE_SLOTS] {
        &self.0
    }

    /// Whether `slot` is set. Out-of-range slots read as released.
    pub fn is_pressed(&self, slot: usize) -> bool {
        self.0.get(slot).is_some_and(|&v| v == 1)
    }

    /// Indices of every set slot, ascending.
    pub fn pressed_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 1)
            .map(|(i, _)| i)
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self([0; STATE_SLOTS])
    }
}
