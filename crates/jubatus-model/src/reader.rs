//! Model file reader: fixed header decoding and raw segment extraction.
//!
//! The header is read in one bounded pass and decoded field by field from a
//! byte cursor, so nothing depends on host endianness or struct layout.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::trace;

use crate::types::*;

//  Header

/// Read and decode the fixed header from the start of `reader`.
///
/// Consumes exactly [`HEADER_SIZE`] bytes on success. End of stream before
/// that is reported as [`ModelError::TruncatedHeader`]; any other read error
/// surfaces as [`ModelError::Io`]. The magic is not validated here.
pub fn decode_header<R: Read>(reader: &mut R) -> Result<ModelHeader, ModelError> {
    let raw = read_header_bytes(reader)?;
    let binary = BinaryHeader::decode(&raw)?;

    trace!(
        format_version = binary.format_version,
        system_data_size = binary.system_data_size,
        user_data_size = binary.user_data_size,
        "header decoded"
    );

    Ok(ModelHeader::from_binary(&binary, raw.to_vec()))
}

impl BinaryHeader {
    /// Decode the big-endian layout from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, ModelError> {
        let mut cur = ByteCursor::new(buf);
        Ok(Self {
            magic: cur.take::<8>()?,
            format_version: cur.read_u64()?,
            major: cur.read_u32()?,
            minor: cur.read_u32()?,
            maintenance: cur.read_u32()?,
            crc32: cur.read_u32()?,
            system_data_size: cur.read_u64()?,
            user_data_size: cur.read_u64()?,
        })
    }

    /// Encode back into the on-disk layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let fields: [&[u8]; 8] = [
            &self.magic[..],
            &self.format_version.to_be_bytes(),
            &self.major.to_be_bytes(),
            &self.minor.to_be_bytes(),
            &self.maintenance.to_be_bytes(),
            &self.crc32.to_be_bytes(),
            &self.system_data_size.to_be_bytes(),
            &self.user_data_size.to_be_bytes(),
        ];
        let mut out = [0u8; HEADER_SIZE];
        let mut pos = 0;
        for field in fields {
            out[pos..pos + field.len()].copy_from_slice(field);
            pos += field.len();
        }
        out
    }
}

//  Segments

/// Read the raw bytes of one segment.
///
/// Seeks to the segment start computed from `header` and reads exactly its
/// declared length. The buffer grows with the bytes actually present, so a
/// corrupt size field cannot force a large allocation up front.
pub fn read_segment<R: Read + Seek>(
    reader: &mut R,
    header: &ModelHeader,
    kind: SegmentKind,
) -> Result<Vec<u8>, ModelError> {
    let range = header
        .segment_range(kind)
        .ok_or_else(|| ModelError::SegmentDecodeFailed {
            kind,
            reason: "segment bounds overflow u64".into(),
        })?;
    let expected = range.end - range.start;

    reader.seek(SeekFrom::Start(range.start))?;
    let mut buf = Vec::new();
    let read = reader.by_ref().take(expected).read_to_end(&mut buf)? as u64;
    if read < expected {
        return Err(ModelError::TruncatedSegment {
            kind,
            expected,
            read,
        });
    }
    Ok(buf)
}

//  Binary reading primitives

fn read_header_bytes(r: &mut impl Read) -> Result<[u8; HEADER_SIZE], ModelError> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ModelError::TruncatedHeader {
                    read: filled,
                    expected: HEADER_SIZE,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ModelError::Io(e)),
        }
    }
    Ok(buf)
}

struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ModelError> {
        let bytes = self
            .buf
            .get(self.pos..)
            .and_then(|rest| rest.get(..N))
            .ok_or_else(|| {
                ModelError::DecodeFailed(format!(
                    "need {} bytes at offset {}, buffer holds {}",
                    N,
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos += N;
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32, ModelError> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    fn read_u64(&mut self) -> Result<u64, ModelError> {
        self.take::<8>().map(u64::from_be_bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn sample() -> BinaryHeader {
        BinaryHeader {
            magic: *b"jubatus:",
            format_version: 1,
            major: 1,
            minor: 2,
            maintenance: 3,
            crc32: 0xDEAD_BEEF,
            system_data_size: 100,
            user_data_size: 200,
        }
    }

    /// Fails every read with the given error kind.
    struct FailingReader(io::ErrorKind);

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(self.0, "boom"))
        }
    }

    /// Hands out one byte per call and interrupts every other call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::ErrorKind::Interrupted.into());
            }
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn decodes_worked_example() {
        let bytes = sample().encode();
        let header = decode_header(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(header.magic, "jubatus:");
        assert_eq!(header.format_version, 1);
        assert_eq!(header.jubatus_version, "1.2.3");
        assert_eq!(header.crc32, 0xDEAD_BEEF);
        assert_eq!(header.system_data_size, 100);
        assert_eq!(header.user_data_size, 200);
        assert_eq!(header.raw, bytes.to_vec());
    }

    #[test]
    fn fields_are_big_endian_at_fixed_offsets() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..8], b"jubatus:");
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 1]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 2]);
        assert_eq!(&bytes[24..28], &[0, 0, 0, 3]);
        assert_eq!(&bytes[28..32], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&bytes[32..40], &[0, 0, 0, 0, 0, 0, 0, 100]);
        assert_eq!(&bytes[40..48], &[0, 0, 0, 0, 0, 0, 0, 200]);
    }

    #[test]
    fn short_stream_is_truncated_not_io() {
        let bytes = sample().encode();
        for len in [0, 1, 10, HEADER_SIZE - 1] {
            let err = decode_header(&mut Cursor::new(&bytes[..len])).unwrap_err();
            match err {
                ModelError::TruncatedHeader { read, expected } => {
                    assert_eq!(read, len);
                    assert_eq!(expected, HEADER_SIZE);
                }
                other => panic!("expected TruncatedHeader for {len} bytes, got {other:?}"),
            }
        }
    }

    #[test]
    fn read_error_is_io() {
        let err = decode_header(&mut FailingReader(io::ErrorKind::PermissionDenied)).unwrap_err();
        assert!(matches!(err, ModelError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn interrupted_and_partial_reads_are_retried() {
        let mut reader = Trickle {
            data: sample().encode().to_vec(),
            pos: 0,
            interrupt: false,
        };
        let header = decode_header(&mut reader).unwrap();
        assert_eq!(header.jubatus_version, "1.2.3");
    }

    #[test]
    fn does_not_consume_past_header() {
        let mut file = sample().encode().to_vec();
        file.extend_from_slice(&[0xAA; 16]);
        let mut cursor = Cursor::new(file);
        decode_header(&mut cursor).unwrap();
        assert_eq!(cursor.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn short_buffer_is_decode_failure() {
        let bytes = sample().encode();
        let err = BinaryHeader::decode(&bytes[..HEADER_SIZE - 4]).unwrap_err();
        assert!(matches!(err, ModelError::DecodeFailed(_)));
    }

    #[test]
    fn magic_keeps_raw_bytes() {
        let mut binary = sample();
        binary.magic = JUBATUS_MAGIC;
        let header = decode_header(&mut Cursor::new(binary.encode())).unwrap();
        assert_eq!(header.magic, "jubatus\0");
        assert!(header.has_magic(&JUBATUS_MAGIC));
    }

    #[test]
    fn zero_version_has_no_padding() {
        let mut binary = sample();
        binary.major = 0;
        binary.minor = 0;
        binary.maintenance = 0;
        let header = decode_header(&mut Cursor::new(binary.encode())).unwrap();
        assert_eq!(header.jubatus_version, "0.0.0");
    }

    #[test]
    fn reads_segments_at_declared_offsets() {
        let mut binary = sample();
        binary.system_data_size = 3;
        binary.user_data_size = 2;
        let mut file = binary.encode().to_vec();
        file.extend_from_slice(b"sysus");
        let mut cursor = Cursor::new(file);

        let header = decode_header(&mut cursor).unwrap();
        assert_eq!(header.declared_len(), Some(HEADER_SIZE as u64 + 5));
        assert_eq!(read_segment(&mut cursor, &header, SegmentKind::User).unwrap(), b"us");
        assert_eq!(read_segment(&mut cursor, &header, SegmentKind::System).unwrap(), b"sys");
    }

    #[test]
    fn short_segment_is_reported() {
        let mut file = sample().encode().to_vec();
        file.extend_from_slice(&[0; 40]);
        let mut cursor = Cursor::new(file);
        let header = decode_header(&mut cursor).unwrap();

        let err = read_segment(&mut cursor, &header, SegmentKind::System).unwrap_err();
        assert!(matches!(
            err,
            ModelError::TruncatedSegment {
                kind: SegmentKind::System,
                expected: 100,
                read: 40,
            }
        ));
    }

    #[test]
    fn overflowing_segment_bounds_are_rejected() {
        let mut binary = sample();
        binary.system_data_size = u64::MAX;
        let header = ModelHeader::from_binary(&binary, binary.encode().to_vec());
        assert_eq!(header.declared_len(), None);

        let err = read_segment(&mut Cursor::new(Vec::<u8>::new()), &header, SegmentKind::User).unwrap_err();
        assert!(matches!(
            err,
            ModelError::SegmentDecodeFailed {
                kind: SegmentKind::User,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Cannot decode user-data segment: segment bounds overflow u64");
    }
}
