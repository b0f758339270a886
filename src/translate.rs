//! Raw sample to controller state translation.
//!
//! The adapter packs the controller report into four bytes. The canonical
//! state orders them as byte 2, two always-zero slots, the low six bits of
//! byte 3, then bytes 0 and 1. Within each byte the most significant bit comes
//! first. The top two bits of byte 3 are reserved by the adapter protocol and
//! never read.

use crate::sample::{ControllerState, RawSample, STATE_SLOTS};

/// Source of one block of output slots: `width` bits of `byte`, taken from bit
/// `width - 1` down to bit 0.
struct SlotRun {
    first_slot: usize,
    byte: usize,
    width: u32,
}

const SLOT_RUNS: [SlotRun; 4] = [
    SlotRun { first_slot: 0, byte: 2, width: 8 },
    // slots 8 and 9 stay zero
    SlotRun { first_slot: 10, byte: 3, width: 6 },
    SlotRun { first_slot: 16, byte: 0, width: 8 },
    SlotRun { first_slot: 24, byte: 1, width: 8 },
];

/// Expands one raw sample into its 32-slot state. Pure and infallible.
pub fn translate(raw: RawSample) -> ControllerState {
    let bytes = raw.bytes();
    let mut slots = [0u8; STATE_SLOTS];

    for run in &SLOT_RUNS {
        let source = bytes[run.byte];
        for offset in 0..run.width {
            let bit = run.width - 1 - offset;
            slots[run.first_slot + offset as usize] = (source >> bit) & 1;
        }
    }

    ControllerState::from_slots(slots)
}
