//! Tagged-field snapshot codec for device models.
//!
//! Every device serializes to a small self-describing blob: a fixed header
//! (4-byte device id + version) followed by `(tag, length, payload)` fields.
//! Unknown tags are skipped on load, so minor-version additions stay
//! compatible; a major-version mismatch is always an error.
//!
//! Snapshots may come from untrusted files. Decoding is strictly bounded by
//! the input length and never allocates more than the input describes.

#![forbid(unsafe_code)]

pub mod codec;

use std::collections::BTreeMap;

pub use codec::{Decoder, Encoder};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot header truncated")]
    TruncatedHeader,
    #[error("snapshot is for a different device (expected {expected:?}, found {found:?})")]
    WrongDevice { expected: [u8; 4], found: [u8; 4] },
    #[error("unsupported snapshot version {found} (supported major: {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
    #[error("field {0:#06x} extends past the end of the snapshot")]
    TruncatedField(u16),
    #[error("field {0:#06x} appears more than once")]
    DuplicateField(u16),
    #[error("invalid field encoding: {0}")]
    InvalidFieldEncoding(&'static str),
    #[error("trailing bytes after the last decoded value")]
    TrailingBytes,
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot format version of a single device.
///
/// The major number gates compatibility; the minor number is informational
/// (new optional fields only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub major: u16,
    pub minor: u16,
}

impl SnapshotVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// A device that can be checkpointed.
pub trait IoSnapshot {
    const DEVICE_ID: [u8; 4];
    const DEVICE_VERSION: SnapshotVersion;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}

/// Serializes tagged fields after a device header.
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    pub fn new(device_id: [u8; 4], version: SnapshotVersion) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&device_id);
        buf.extend_from_slice(&version.major.to_le_bytes());
        buf.extend_from_slice(&version.minor.to_le_bytes());
        Self { buf }
    }

    fn field(&mut self, tag: u16, payload: &[u8]) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    pub fn field_u8(&mut self, tag: u16, value: u8) {
        self.field(tag, &[value]);
    }

    pub fn field_u32(&mut self, tag: u16, value: u32) {
        self.field(tag, &value.to_le_bytes());
    }

    pub fn field_bool(&mut self, tag: u16, value: bool) {
        self.field_u8(tag, value as u8);
    }

    pub fn field_bytes(&mut self, tag: u16, payload: Vec<u8>) {
        self.field(tag, &payload);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Parses a device blob produced by [`SnapshotWriter`].
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    version: SnapshotVersion,
    fields: BTreeMap<u16, &'a [u8]>,
}

impl<'a> SnapshotReader<'a> {
    pub fn parse(bytes: &'a [u8], device_id: [u8; 4]) -> SnapshotResult<Self> {
        if bytes.len() < 8 {
            return Err(SnapshotError::TruncatedHeader);
        }
        let found: [u8; 4] = bytes[0..4].try_into().unwrap();
        if found != device_id {
            return Err(SnapshotError::WrongDevice {
                expected: device_id,
                found,
            });
        }
        let version = SnapshotVersion {
            major: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            minor: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
        };

        let mut fields = BTreeMap::new();
        let mut pos = 8usize;
        while pos < bytes.len() {
            if bytes.len() - pos < 6 {
                return Err(SnapshotError::TruncatedHeader);
            }
            let tag = u16::from_le_bytes(bytes[pos..pos + 2].try_into().unwrap());
            let len = u32::from_le_bytes(bytes[pos + 2..pos + 6].try_into().unwrap()) as usize;
            pos += 6;
            if bytes.len() - pos < len {
                return Err(SnapshotError::TruncatedField(tag));
            }
            if fields.insert(tag, &bytes[pos..pos + len]).is_some() {
                return Err(SnapshotError::DuplicateField(tag));
            }
            pos += len;
        }

        Ok(Self { version, fields })
    }

    pub fn device_version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn ensure_device_major(&self, major: u16) -> SnapshotResult<()> {
        if self.version.major != major {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version.major,
                supported: major,
            });
        }
        Ok(())
    }

    pub fn bytes(&self, tag: u16) -> Option<&'a [u8]> {
        self.fields.get(&tag).copied()
    }

    pub fn u8(&self, tag: u16) -> SnapshotResult<Option<u8>> {
        match self.bytes(tag) {
            None => Ok(None),
            Some([v]) => Ok(Some(*v)),
            Some(_) => Err(SnapshotError::InvalidFieldEncoding("u8 field length")),
        }
    }

    pub fn u32(&self, tag: u16) -> SnapshotResult<Option<u32>> {
        match self.bytes(tag) {
            None => Ok(None),
            Some(buf) if buf.len() == 4 => {
                Ok(Some(u32::from_le_bytes(buf.try_into().unwrap())))
            }
            Some(_) => Err(SnapshotError::InvalidFieldEncoding("u32 field length")),
        }
    }

    pub fn bool(&self, tag: u16) -> SnapshotResult<Option<bool>> {
        match self.u8(tag)? {
            None => Ok(None),
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            Some(_) => Err(SnapshotError::InvalidFieldEncoding("bool field value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: [u8; 4] = *b"TST0";
    const V1: SnapshotVersion = SnapshotVersion::new(1, 0);

    #[test]
    fn writer_reader_roundtrip() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_u32(1, 0xdead_beef);
        w.field_bool(2, true);
        w.field_bytes(3, vec![1, 2, 3]);
        let blob = w.finish();

        let r = SnapshotReader::parse(&blob, ID).unwrap();
        assert_eq!(r.device_version(), V1);
        assert_eq!(r.u32(1).unwrap(), Some(0xdead_beef));
        assert_eq!(r.bool(2).unwrap(), Some(true));
        assert_eq!(r.bytes(3), Some(&[1u8, 2, 3][..]));
        assert_eq!(r.u32(4).unwrap(), None);
    }

    #[test]
    fn wrong_device_id_is_rejected() {
        let blob = SnapshotWriter::new(ID, V1).finish();
        assert_eq!(
            SnapshotReader::parse(&blob, *b"OTHR").unwrap_err(),
            SnapshotError::WrongDevice {
                expected: *b"OTHR",
                found: ID,
            }
        );
    }

    #[test]
    fn major_version_mismatch_is_rejected() {
        let blob = SnapshotWriter::new(ID, SnapshotVersion::new(2, 0)).finish();
        let r = SnapshotReader::parse(&blob, ID).unwrap();
        assert_eq!(
            r.ensure_device_major(1).unwrap_err(),
            SnapshotError::UnsupportedVersion {
                found: 2,
                supported: 1,
            }
        );
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut w = SnapshotWriter::new(ID, V1);
        w.field_u32(7, 1);
        w.field_u32(7, 2);
        let blob = w.finish();
        assert_eq!(
            SnapshotReader::parse(&blob, ID).unwrap_err(),
            SnapshotError::DuplicateField(7)
        );
    }
}
