//! Length-prefix helpers for nested payloads inside a snapshot field.

use crate::{SnapshotError, SnapshotResult};

/// Builder-style encoder for a nested byte stream.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn bytes(mut self, payload: &[u8]) -> Self {
        self.buf.extend_from_slice(payload);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a nested byte stream; every read is bounds-checked.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> SnapshotResult<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return Err(SnapshotError::InvalidFieldEncoding("nested stream truncated"));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> SnapshotResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> SnapshotResult<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn u32(&mut self) -> SnapshotResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn bytes(&mut self, len: usize) -> SnapshotResult<&'a [u8]> {
        self.take(len)
    }

    /// Asserts the stream was fully consumed.
    pub fn finish(self) -> SnapshotResult<()> {
        if self.pos != self.buf.len() {
            return Err(SnapshotError::TrailingBytes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let buf = Encoder::new().u8(7).u16(0x1234).u32(0xdead_beef).bytes(b"xy").finish();
        let mut d = Decoder::new(&buf);
        assert_eq!(d.u8().unwrap(), 7);
        assert_eq!(d.u16().unwrap(), 0x1234);
        assert_eq!(d.u32().unwrap(), 0xdead_beef);
        assert_eq!(d.bytes(2).unwrap(), b"xy");
        d.finish().unwrap();
    }

    #[test]
    fn truncated_reads_fail() {
        let buf = Encoder::new().u16(1).finish();
        let mut d = Decoder::new(&buf);
        assert!(d.u32().is_err());
    }

    #[test]
    fn trailing_bytes_fail() {
        let buf = Encoder::new().u32(1).u8(2).finish();
        let mut d = Decoder::new(&buf);
        d.u32().unwrap();
        assert_eq!(d.finish().unwrap_err(), SnapshotError::TrailingBytes);
    }
}
