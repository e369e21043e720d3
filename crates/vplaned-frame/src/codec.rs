//! Wire format of a single frame.
//!
//! ```text
//! offset  size  field
//! 0       2     magic "VP"
//! 2       4     payload length, little endian
//! 6       1     flags (MORE, VOID)
//! 7       1     reserved, always 0
//! 8       len   payload
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

pub const HEADER_SIZE: usize = 8;

pub const MAGIC: [u8; 2] = *b"VP";

/// Another part of the same message follows this frame.
pub const FLAG_MORE: u8 = 0x01;

/// The frame stands for a message with no parts. Its payload is empty.
pub const FLAG_VOID: u8 = 0x02;

/// 16 MiB per part.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

pub const DEFAULT_MAX_PARTS: usize = 64;

/// Decoded fixed-size frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub len: usize,
    pub flags: u8,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`, or `None` if fewer than
    /// [`HEADER_SIZE`] bytes are available.
    pub fn peek(buf: &[u8], max_payload: usize) -> Result<Option<Self>> {
        let Some(raw) = buf.get(..HEADER_SIZE) else {
            return Ok(None);
        };
        if raw[..2] != MAGIC {
            return Err(FrameError::InvalidMagic);
        }
        let len = u32::from_le_bytes([raw[2], raw[3], raw[4], raw[5]]) as usize;
        if len > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: max_payload,
            });
        }
        let header = Self { len, flags: raw[6] };
        header.check()?;
        Ok(Some(header))
    }

    fn check(&self) -> Result<()> {
        let unknown = self.flags & !(FLAG_MORE | FLAG_VOID) != 0;
        let bad_void = self.flags & FLAG_VOID != 0 && (self.flags & FLAG_MORE != 0 || self.len > 0);
        if unknown || bad_void {
            return Err(FrameError::InvalidFlags(self.flags));
        }
        Ok(())
    }

    fn put(&self, dst: &mut BytesMut) {
        dst.put_slice(&MAGIC);
        dst.put_u32_le(self.len as u32);
        dst.put_u8(self.flags);
        dst.put_u8(0);
    }
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>, more: bool) -> Self {
        Self {
            flags: if more { FLAG_MORE } else { 0 },
            payload: payload.into(),
        }
    }

    /// Marker frame for a zero-part message.
    pub fn void() -> Self {
        Self {
            flags: FLAG_VOID,
            payload: Bytes::new(),
        }
    }

    pub fn more(&self) -> bool {
        self.flags & FLAG_MORE != 0
    }

    pub fn is_void(&self) -> bool {
        self.flags & FLAG_VOID != 0
    }

    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Append one frame to `dst`.
pub fn encode_frame(flags: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if u32::try_from(payload.len()).is_err() {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    let header = FrameHeader {
        len: payload.len(),
        flags,
    };
    header.check()?;

    dst.reserve(HEADER_SIZE + payload.len());
    header.put(dst);
    dst.put_slice(payload);
    Ok(())
}

/// Take one complete frame off the front of `src`.
///
/// Returns `Ok(None)` and leaves `src` untouched until the whole frame has
/// arrived. Header errors are reported as soon as the header is readable.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(header) = FrameHeader::peek(src, max_payload)? else {
        return Ok(None);
    };
    if src.len() < HEADER_SIZE + header.len {
        return Ok(None);
    }
    src.advance(HEADER_SIZE);
    Ok(Some(Frame {
        flags: header.flags,
        payload: src.split_to(header.len).freeze(),
    }))
}

/// Limits and socket timeouts shared by [`crate::FrameReader`] and
/// [`crate::FrameWriter`].
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub max_payload_size: usize,
    pub max_parts: usize,
    /// Applied as the socket read timeout; `None` blocks forever.
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_parts: DEFAULT_MAX_PARTS,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
