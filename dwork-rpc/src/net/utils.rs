use std::mem;

use bytes::{BufMut, BytesMut};
use rkyv::bytecheck::CheckBytes;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};

use crate::net::CodecError;
use crate::{MAX_VALUE_SIZE, SCRATCH_SPACE, VALUE_FORMAT_VERSION};

pub const OPCODE_SIZE: usize = mem::size_of::<i32>();
pub const COUNT_SIZE: usize = mem::size_of::<i32>();
pub const HEADER_SIZE: usize = OPCODE_SIZE + COUNT_SIZE;

pub const VERSION_SIZE: usize = mem::size_of::<u8>();
pub const VALUE_LEN_SIZE: usize = mem::size_of::<u32>();
pub const CHECKSUM_SIZE: usize = mem::size_of::<u32>();
pub const VALUE_HEADER_SIZE: usize = VERSION_SIZE + VALUE_LEN_SIZE + CHECKSUM_SIZE;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// The fixed header of every request and response frame.
pub(crate) struct FrameHeader {
    pub(crate) opcode: i32,
    pub(crate) num_params: i32,
}

/// Writes a frame header into the buffer.
pub(crate) fn serialize_header(buf: &mut BytesMut, opcode: i32, num_params: usize) {
    buf.reserve(HEADER_SIZE);
    buf.put_i32(opcode);
    buf.put_i32(num_params as i32);
}

/// Parses a frame header.
pub(crate) fn parse_header(header: [u8; HEADER_SIZE]) -> FrameHeader {
    let (opcode, num_params) = header.split_at(OPCODE_SIZE);
    FrameHeader {
        opcode: i32::from_be_bytes([opcode[0], opcode[1], opcode[2], opcode[3]]),
        num_params: i32::from_be_bytes([
            num_params[0],
            num_params[1],
            num_params[2],
            num_params[3],
        ]),
    }
}

/// Archives a value and writes it into the buffer behind its envelope header.
///
/// ```text
/// [version: u8][len: u32][crc32: u32][archive bytes]
/// ```
pub(crate) fn serialize_value<T>(buf: &mut BytesMut, value: &T) -> Result<(), CodecError>
where
    T: Serialize<AllocSerializer<SCRATCH_SPACE>>,
{
    let archive = rkyv::to_bytes::<_, SCRATCH_SPACE>(value)
        .map_err(|_| CodecError::Serialize)?;

    if archive.len() > MAX_VALUE_SIZE {
        return Err(CodecError::TooLarge(archive.len()));
    }

    buf.reserve(VALUE_HEADER_SIZE + archive.len());
    buf.put_u8(VALUE_FORMAT_VERSION);
    buf.put_u32(archive.len() as u32);
    buf.put_u32(crc32fast::hash(&archive));
    buf.put_slice(&archive);

    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ValueHeader {
    pub(crate) len: usize,
    pub(crate) checksum: u32,
}

/// Parses and validates the envelope header of a value.
pub(crate) fn parse_value_header(
    header: [u8; VALUE_HEADER_SIZE],
) -> Result<ValueHeader, CodecError> {
    let version = header[0];
    if version != VALUE_FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if len > MAX_VALUE_SIZE {
        return Err(CodecError::TooLarge(len));
    }

    let checksum = u32::from_be_bytes([header[5], header[6], header[7], header[8]]);

    Ok(ValueHeader { len, checksum })
}

/// Validates the archive against its checksum and deserializes it.
pub(crate) fn deserialize_value<T>(
    header: ValueHeader,
    archive: &AlignedVec,
) -> Result<T, CodecError>
where
    T: Archive + 'static,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>>
        + Deserialize<T, SharedDeserializeMap>,
{
    if crc32fast::hash(archive) != header.checksum {
        return Err(CodecError::ChecksumMismatch);
    }

    rkyv::from_bytes::<T>(archive).map_err(|_| CodecError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn split_value(buf: &[u8]) -> ([u8; VALUE_HEADER_SIZE], AlignedVec) {
        let mut header = [0; VALUE_HEADER_SIZE];
        header.copy_from_slice(&buf[..VALUE_HEADER_SIZE]);

        let mut archive = AlignedVec::with_capacity(buf.len() - VALUE_HEADER_SIZE);
        archive.extend_from_slice(&buf[VALUE_HEADER_SIZE..]);
        (header, archive)
    }

    #[test]
    fn test_header_layout() {
        let mut buf = BytesMut::new();
        serialize_header(&mut buf, 4, 1);
        assert_eq!(&buf[..], &[0, 0, 0, 4, 0, 0, 0, 1]);

        let mut header = [0; HEADER_SIZE];
        header.copy_from_slice(&buf);
        assert_eq!(
            parse_header(header),
            FrameHeader {
                opcode: 4,
                num_params: 1
            }
        );
    }

    #[test]
    fn test_negative_opcode_header() {
        let header = parse_header([0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
        assert_eq!(header.opcode, -1);
        assert_eq!(header.num_params, 0);
    }

    #[test]
    fn test_value_envelope() {
        let mut buf = BytesMut::new();
        serialize_value(&mut buf, &Value::Str("node-1".to_string())).unwrap();
        assert_eq!(buf[0], VALUE_FORMAT_VERSION);

        let (header, archive) = split_value(&buf);
        let header = parse_value_header(header).expect("Valid header");
        assert_eq!(header.len, archive.len());

        let value: Value = deserialize_value(header, &archive).expect("Valid value");
        assert_eq!(value, Value::Str("node-1".to_string()));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut buf = BytesMut::new();
        serialize_value(&mut buf, &Value::Long(7)).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xff;

        let (header, archive) = split_value(&buf);
        let header = parse_value_header(header).unwrap();
        let res = deserialize_value::<Value>(header, &archive);
        assert_eq!(res, Err(CodecError::ChecksumMismatch));
    }

    #[test]
    fn test_unsupported_version() {
        let mut header = [0; VALUE_HEADER_SIZE];
        header[0] = VALUE_FORMAT_VERSION + 1;
        assert_eq!(
            parse_value_header(header),
            Err(CodecError::UnsupportedVersion(VALUE_FORMAT_VERSION + 1))
        );
    }

    #[test]
    fn test_oversized_value_rejected() {
        let mut header = [0; VALUE_HEADER_SIZE];
        header[0] = VALUE_FORMAT_VERSION;
        header[1..5].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            parse_value_header(header),
            Err(CodecError::TooLarge(_))
        ));
    }
}
