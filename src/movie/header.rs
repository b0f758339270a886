//! Fixed 1024-byte `.m64` header.
//!
//! All integers are little-endian. Text fields are fixed-width and
//! null-padded; over-long values are truncated to fit.
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | signature `4D 36 34 1A` |
//! | 4 | 4 | format version |
//! | 8 | 4 | session unique id |
//! | 12 | 4 | frame count |
//! | 16 | 4 | rerecord count |
//! | 20 | 1 | frames per second |
//! | 21 | 1 | controller count |
//! | 22 | 2 | reserved |
//! | 24 | 4 | input sample count |
//! | 28 | 2 | movie start type |
//! | 30 | 2 | reserved |
//! | 32 | 4 | controller flags |
//! | 36 | 160 | reserved |
//! | 196 | 32 | ROM internal name (ASCII) |
//! | 228 | 4 | ROM checksum |
//! | 232 | 2 | country code |
//! | 234 | 56 | reserved |
//! | 290 | 64 × 4 | video, audio, input, RSP plugin names (ASCII) |
//! | 546 | 222 | author (UTF-8) |
//! | 768 | 256 | description (UTF-8) |

use crate::error::{AppResult, CaptureError};
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// Total header length in bytes.
pub const HEADER_SIZE: usize = 1024;

/// `"M64\x1A"` read as a little-endian u32.
pub const SIGNATURE: u32 = 0x1A34_364D;

/// Byte offset of the frame-count field, patched when a movie is closed.
pub const FRAME_COUNT_OFFSET: u64 = 12;

const ROM_NAME_LEN: usize = 32;
const PLUGIN_NAME_LEN: usize = 64;
const AUTHOR_LEN: usize = 222;
const DESCRIPTION_LEN: usize = 256;

/// Movie metadata, built once per session and never mutated afterwards.
///
/// Missing fields fall back to [`MovieHeader::default`] when deserialized, so
/// a configuration file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieHeader {
    /// Format version (3 for current tooling).
    pub version: u32,
    /// Unique id tying save states to this movie.
    pub uid: u32,
    /// Frame count written into the header at creation. Whether it is
    /// replaced at close depends on the writer's `FrameCountPatch`.
    pub frame_count: u32,
    /// Re-record counter carried over from the metadata template.
    pub rerecord_count: u32,
    /// Frames per second (60 NTSC, 50 PAL).
    pub fps: u8,
    /// Number of controllers in use.
    pub controller_count: u8,
    /// Input sample count stored in the header; not updated at close.
    pub input_samples: u32,
    /// 1 = from snapshot, 2 = from power-on, 4 = from EEPROM.
    pub start_type: u16,
    /// Bitmask of present controllers and their accessories.
    pub controller_flags: u32,
    /// Internal ROM name, 32 ASCII bytes on disk.
    pub rom_name: String,
    /// CRC of the ROM the movie was recorded on.
    pub rom_crc: u32,
    /// ROM region code.
    pub country_code: u16,
    /// Video plugin name, 64 ASCII bytes on disk.
    pub video_plugin: String,
    /// Audio plugin name, 64 ASCII bytes on disk.
    pub audio_plugin: String,
    /// Input plugin name, 64 ASCII bytes on disk.
    pub input_plugin: String,
    /// RSP plugin name, 64 ASCII bytes on disk.
    pub rsp_plugin: String,
    /// Author, 222 UTF-8 bytes on disk.
    pub author: String,
    /// Free-form description, 256 UTF-8 bytes on disk.
    pub description: String,
}

impl Default for MovieHeader {
    fn default() -> Self {
        Self {
            version: 3,
            uid: session_uid(),
            frame_count: 15_678,
            rerecord_count: 164_623,
            fps: 60,
            controller_count: 1,
            input_samples: 7_563,
            start_type: 2,
            controller_flags: 1,
            rom_name: "SUPER MARIO 64".to_string(),
            rom_crc: 238_922_318,
            country_code: 74,
            video_plugin: "Jabo's Direct3D8 1.6".to_string(),
            audio_plugin: "Jabo's DirectSound 1.6".to_string(),
            input_plugin: "TAS Input Plugin 0.6".to_string(),
            rsp_plugin: "RSP emulation Plugin".to_string(),
            author: "minikori deftek".to_string(),
            description: "tests".to_string(),
        }
    }
}

/// Current unix time, used as the session unique id. Saturates at
/// `u32::MAX` from 2106 on.
pub fn session_uid() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX)
}

impl MovieHeader {
    /// Same metadata with a different unique id.
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Serialize to the fixed on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);

        buf.put_u32_le(SIGNATURE);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.uid);
        buf.put_u32_le(self.frame_count);
        buf.put_u32_le(self.rerecord_count);
        buf.put_u8(self.fps);
        buf.put_u8(self.controller_count);
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.input_samples);
        buf.put_u16_le(self.start_type);
        buf.put_bytes(0, 2);
        buf.put_u32_le(self.controller_flags);
        buf.put_bytes(0, 160);

        put_ascii(&mut buf, &self.rom_name, ROM_NAME_LEN);
        buf.put_u32_le(self.rom_crc);
        buf.put_u16_le(self.country_code);
        buf.put_bytes(0, 56);

        put_ascii(&mut buf, &self.video_plugin, PLUGIN_NAME_LEN);
        put_ascii(&mut buf, &self.audio_plugin, PLUGIN_NAME_LEN);
        put_ascii(&mut buf, &self.input_plugin, PLUGIN_NAME_LEN);
        put_ascii(&mut buf, &self.rsp_plugin, PLUGIN_NAME_LEN);
        put_utf8(&mut buf, &self.author, AUTHOR_LEN);
        put_utf8(&mut buf, &self.description, DESCRIPTION_LEN);

        debug_assert_eq!(buf.len(), HEADER_SIZE);
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode a header from the first 1024 bytes of `bytes`.
    ///
    /// # Errors
    /// [`CaptureError::MovieFormat`] if the slice is too short or the
    /// signature does not match.
    pub fn parse(bytes: &[u8]) -> AppResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CaptureError::MovieFormat(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = &bytes[..HEADER_SIZE];

        let signature = buf.get_u32_le();
        if signature != SIGNATURE {
            return Err(CaptureError::MovieFormat(format!(
                "bad signature {signature:#010x}"
            )));
        }

        let version = buf.get_u32_le();
        let uid = buf.get_u32_le();
        let frame_count = buf.get_u32_le();
        let rerecord_count = buf.get_u32_le();
        let fps = buf.get_u8();
        let controller_count = buf.get_u8();
        buf.advance(2);
        let input_samples = buf.get_u32_le();
        let start_type = buf.get_u16_le();
        buf.advance(2);
        let controller_flags = buf.get_u32_le();
        buf.advance(160);

        let rom_name = take_text(&mut buf, ROM_NAME_LEN);
        let rom_crc = buf.get_u32_le();
        let country_code = buf.get_u16_le();
        buf.advance(56);

        let video_plugin = take_text(&mut buf, PLUGIN_NAME_LEN);
        let audio_plugin = take_text(&mut buf, PLUGIN_NAME_LEN);
        let input_plugin = take_text(&mut buf, PLUGIN_NAME_LEN);
        let rsp_plugin = take_text(&mut buf, PLUGIN_NAME_LEN);
        let author = take_text(&mut buf, AUTHOR_LEN);
        let description = take_text(&mut buf, DESCRIPTION_LEN);

        Ok(Self {
            version,
            uid,
            frame_count,
            rerecord_count,
            fps,
            controller_count,
            input_samples,
            start_type,
            controller_flags,
            rom_name,
            rom_crc,
            country_code,
            video_plugin,
            audio_plugin,
            input_plugin,
            rsp_plugin,
            author,
            description,
        })
    }
}

/// Writes `text` as ASCII into a `width`-byte field. Non-ASCII characters
/// become `?`.
fn put_ascii(buf: &mut BytesMut, text: &str, width: usize) {
    let mut written = 0;
    for ch in text.chars().take(width) {
        buf.put_u8(if ch.is_ascii() { ch as u8 } else { b'?' });
        written += 1;
    }
    buf.put_bytes(0, width - written);
}

/// Writes `text` as UTF-8 into a `width`-byte field, truncating on a
/// character boundary.
fn put_utf8(buf: &mut BytesMut, text: &str, width: usize) {
    let mut end = text.len().min(width);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_slice(&text.as_bytes()[..end]);
    buf.put_bytes(0, width - end);
}

fn take_text(buf: &mut &[u8], width: usize) -> String {
    let field = &buf[..width];
    let len = field.iter().position(|&b| b == 0).unwrap_or(width);
    let text = String::from_utf8_lossy(&field[..len]).into_owned();
    buf.advance(width);
    text
}
