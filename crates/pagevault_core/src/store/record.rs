//! Page log record framing.
//!
//! Every page log is a sequence of self-checking records:
//!
//! ```text
//! ┌────────┬─────────┬──────┬─────────┬─────────────┬───────┐
//! │ "PGLG" │ version │ type │ len u32 │ payload     │ crc32 │
//! │ 4 B    │ u16     │ u8   │         │ len bytes   │       │
//! └────────┴─────────┴──────┴─────────┴─────────────┴───────┘
//! ```
//!
//! All integers are little-endian. The CRC covers header and payload.
//! A record cut short at the end of the log is treated as the end of the
//! log, since that is what a crash halfway through an append leaves
//! behind. A bad magic, an unknown type or a CRC mismatch is corruption.

use crate::crypto::PassphraseDigest;
use crate::diff::{Delta, DeltaOp};
use crate::error::{CoreError, CoreResult};
use crate::log::{Payload, Revision};
use crate::state::PageState;
use crate::types::Timestamp;

/// Magic bytes identifying a page log record.
pub const RECORD_MAGIC: [u8; 4] = *b"PGLG";

/// Current record format version.
pub const RECORD_VERSION: u16 = 1;

/// Envelope header size: magic (4) + version (2) + type (1) + length (4).
pub const HEADER_SIZE: usize = 11;

/// Size of the trailing CRC.
pub const CRC_SIZE: usize = 4;

const PAYLOAD_SNAPSHOT: u8 = 0;
const PAYLOAD_DELTA: u8 = 1;

const OP_RETAIN: u8 = 0;
const OP_DELETE: u8 = 1;
const OP_INSERT: u8 = 2;

const FLAG_LOCKED: u8 = 0b001;
const FLAG_ENCRYPTED: u8 = 0b010;
const FLAG_PRIMED: u8 = 0b100;

/// Type of a page log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// One revision of the page text.
    Revision = 1,
    /// The page state as of this point in the log.
    State = 2,
    /// Discards every revision recorded before it.
    Reset = 3,
}

impl RecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Revision),
            2 => Some(Self::State),
            3 => Some(Self::Reset),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One entry of a page log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRecord {
    /// A revision, in log order.
    Revision(Revision),
    /// The page state. The last one in the log wins.
    State(PageState),
    /// History scrubbed: revisions before this record are dropped.
    Reset,
}

impl PageRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Revision(_) => RecordType::Revision,
            Self::State(_) => RecordType::State,
            Self::Reset => RecordType::Reset,
        }
    }

    /// Serializes the record payload (without envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if a length does not fit in 32 bits.
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Revision(revision) => {
                buf.extend_from_slice(&revision.timestamp.as_nanos().to_le_bytes());
                buf.extend_from_slice(&revision.change_sum.to_le_bytes());
                match &revision.payload {
                    Payload::Snapshot(text) => {
                        buf.push(PAYLOAD_SNAPSHOT);
                        put_bytes(&mut buf, text)?;
                    }
                    Payload::Delta(delta) => {
                        buf.push(PAYLOAD_DELTA);
                        put_len(&mut buf, delta.ops().len())?;
                        for op in delta.ops() {
                            match op {
                                DeltaOp::Retain(n) => {
                                    buf.push(OP_RETAIN);
                                    put_len(&mut buf, *n)?;
                                }
                                DeltaOp::Delete(n) => {
                                    buf.push(OP_DELETE);
                                    put_len(&mut buf, *n)?;
                                }
                                DeltaOp::Insert(bytes) => {
                                    buf.push(OP_INSERT);
                                    put_bytes(&mut buf, bytes)?;
                                }
                            }
                        }
                    }
                }
            }

            Self::State(state) => {
                let mut flags = 0u8;
                if state.is_locked() {
                    flags |= FLAG_LOCKED;
                }
                if state.is_encrypted() {
                    flags |= FLAG_ENCRYPTED;
                }
                if state.is_primed() {
                    flags |= FLAG_PRIMED;
                }
                buf.push(flags);
                // digest: 1 byte flag + optional length-prefixed bytes
                if let Some(digest) = state.digest() {
                    buf.push(1);
                    put_bytes(&mut buf, digest.as_bytes())?;
                } else {
                    buf.push(0);
                }
            }

            Self::Reset => {}
        }
        Ok(buf)
    }

    /// Deserializes a record from its type and payload.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> CoreResult<Self> {
        let mut cursor = Cursor::new(payload);
        let record = match record_type {
            RecordType::Revision => {
                let timestamp = Timestamp::from_nanos(cursor.read_i64()?);
                let change_sum = cursor.read_u64()?;
                let payload = match cursor.read_u8()? {
                    PAYLOAD_SNAPSHOT => Payload::Snapshot(cursor.read_bytes()?.to_vec()),
                    PAYLOAD_DELTA => {
                        let count = cursor.read_len()?;
                        let mut ops = Vec::with_capacity(count.min(payload.len()));
                        for _ in 0..count {
                            let op = match cursor.read_u8()? {
                                OP_RETAIN => DeltaOp::Retain(cursor.read_len()?),
                                OP_DELETE => DeltaOp::Delete(cursor.read_len()?),
                                OP_INSERT => DeltaOp::Insert(cursor.read_bytes()?.to_vec()),
                                tag => {
                                    return Err(CoreError::log_corruption(format!(
                                        "unknown delta op {tag}"
                                    )))
                                }
                            };
                            ops.push(op);
                        }
                        Payload::Delta(Delta::from_ops(ops))
                    }
                    kind => {
                        return Err(CoreError::log_corruption(format!(
                            "unknown revision payload kind {kind}"
                        )))
                    }
                };
                Self::Revision(Revision {
                    timestamp,
                    change_sum,
                    payload,
                })
            }

            RecordType::State => {
                let flags = cursor.read_u8()?;
                if flags & !(FLAG_LOCKED | FLAG_ENCRYPTED | FLAG_PRIMED) != 0 {
                    return Err(CoreError::log_corruption(format!(
                        "unknown state flags {flags:#04x}"
                    )));
                }
                let digest = match cursor.read_u8()? {
                    0 => None,
                    _ => Some(PassphraseDigest::from_bytes(cursor.read_bytes()?.to_vec())),
                };
                Self::State(PageState::from_flags(
                    flags & FLAG_LOCKED != 0,
                    flags & FLAG_ENCRYPTED != 0,
                    flags & FLAG_PRIMED != 0,
                    digest,
                )?)
            }

            RecordType::Reset => Self::Reset,
        };

        if cursor.remaining() != 0 {
            return Err(CoreError::log_corruption(format!(
                "trailing bytes in {record_type:?} record: {} unread",
                cursor.remaining()
            )));
        }
        Ok(record)
    }

    /// Serializes the record with its envelope.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);

        data.extend_from_slice(&RECORD_MAGIC);
        data.extend_from_slice(&RECORD_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        put_len(&mut data, payload.len())?;
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> CoreResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| CoreError::invalid_format(format!("length {len} does not fit in u32")))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> CoreResult<()> {
    put_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked little-endian reader over a record payload.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CoreError::log_corruption("unexpected end of payload"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> CoreResult<[u8; N]> {
        self.take(N)?
            .try_into()
            .map_err(|_| CoreError::log_corruption("unexpected end of payload"))
    }

    fn read_u8(&mut self) -> CoreResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_len(&mut self) -> CoreResult<usize> {
        Ok(u32::from_le_bytes(self.read_array()?) as usize)
    }

    fn read_u64(&mut self) -> CoreResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> CoreResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    fn read_bytes(&mut self) -> CoreResult<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }
}

/// Iterator over the records of a page log held in memory.
///
/// Yields `(offset, record)` pairs. Stops cleanly at a truncated tail and
/// yields one error, then stops, on corruption.
pub struct RecordIter<'a> {
    data: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> RecordIter<'a> {
    /// Creates an iterator over `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            finished: false,
        }
    }

    /// Returns the offset just past the last record read.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, PageRecord)>> {
        let start = self.offset;
        let rest = &self.data[start..];
        if rest.len() < HEADER_SIZE {
            return Ok(None);
        }

        if rest[0..4] != RECORD_MAGIC {
            return Err(CoreError::log_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > RECORD_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported record version {version} at offset {start}"
            )));
        }

        let type_byte = rest[6];
        let record_type = RecordType::from_byte(type_byte).ok_or_else(|| {
            CoreError::log_corruption(format!(
                "unknown record type {type_byte} at offset {start}"
            ))
        })?;

        let payload_len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let total_len = HEADER_SIZE + payload_len + CRC_SIZE;
        if rest.len() < total_len {
            return Ok(None);
        }

        let payload_end = HEADER_SIZE + payload_len;
        let stored_crc = u32::from_le_bytes([
            rest[payload_end],
            rest[payload_end + 1],
            rest[payload_end + 2],
            rest[payload_end + 3],
        ]);
        let computed_crc = compute_crc32(&rest[..payload_end]);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let record = PageRecord::decode_payload(record_type, &rest[HEADER_SIZE..payload_end])?;
        self.offset += total_len;
        Ok(Some((start as u64, record)))
    }
}

impl Iterator for RecordIter<'_> {
    type Item = CoreResult<(u64, PageRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial, reflected
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesGcmCrypto;

    fn delta_revision() -> Revision {
        Revision {
            timestamp: Timestamp::from_nanos(1_700_000_000_123_456_789),
            change_sum: 7,
            payload: Payload::Delta(Delta::between(b"hello world", b"hello, brave world")),
        }
    }

    fn decode_all(data: &[u8]) -> CoreResult<Vec<PageRecord>> {
        RecordIter::new(data).map(|r| r.map(|(_, rec)| rec)).collect()
    }

    #[test]
    fn record_type_roundtrip() {
        for t in [RecordType::Revision, RecordType::State, RecordType::Reset] {
            assert_eq!(RecordType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(RecordType::from_byte(0), None);
    }

    #[test]
    fn records_survive_the_envelope() {
        let (locked, _) = PageState::new()
            .toggled_lock("p", "pw", &AesGcmCrypto)
            .unwrap();
        let records = vec![
            PageRecord::Revision(Revision {
                timestamp: Timestamp::from_secs(1),
                change_sum: 3,
                payload: Payload::Snapshot(b"abc".to_vec()),
            }),
            PageRecord::Revision(delta_revision()),
            PageRecord::State(locked),
            PageRecord::Reset,
            PageRecord::State(PageState::new().primed("p").unwrap()),
        ];

        let mut data = Vec::new();
        for record in &records {
            data.extend(record.encode().unwrap());
        }
        assert_eq!(decode_all(&data).unwrap(), records);
    }

    #[test]
    fn truncated_tail_is_end_of_log() {
        let first = PageRecord::Revision(delta_revision()).encode().unwrap();
        let second = PageRecord::State(PageState::new()).encode().unwrap();

        let mut data = first.clone();
        data.extend_from_slice(&second[..second.len() - 1]);

        let mut iter = RecordIter::new(&data);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert_eq!(iter.offset(), first.len());
    }

    #[test]
    fn partial_header_is_end_of_log() {
        let data = RECORD_MAGIC.to_vec();
        assert!(decode_all(&data).unwrap().is_empty());
    }

    #[test]
    fn crc_mismatch_is_fatal() {
        let mut data = PageRecord::Revision(delta_revision()).encode().unwrap();
        data[HEADER_SIZE + 2] ^= 0x01;
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(err, CoreError::ChecksumMismatch { .. }));
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut data = PageRecord::Reset.encode().unwrap();
        data[0] = b'X';
        let err = decode_all(&data).unwrap_err();
        assert!(matches!(err, CoreError::LogCorruption { .. }));
    }

    #[test]
    fn unknown_type_is_fatal() {
        let mut data = PageRecord::Reset.encode().unwrap();
        data[6] = 99;
        let crc = compute_crc32(&data[..HEADER_SIZE]);
        data[HEADER_SIZE..].copy_from_slice(&crc.to_le_bytes());
        assert!(decode_all(&data).is_err());
    }

    #[test]
    fn state_claiming_lock_and_encryption_is_rejected() {
        let payload = [FLAG_LOCKED | FLAG_ENCRYPTED, 0];
        let err = PageRecord::decode_payload(RecordType::State, &payload).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn trailing_payload_bytes_rejected() {
        let mut payload = PageRecord::State(PageState::new()).encode_payload().unwrap();
        payload.push(0);
        assert!(PageRecord::decode_payload(RecordType::State, &payload).is_err());
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }
}
