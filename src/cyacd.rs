use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Size of the header when the checksum type tag is present.
pub const HEADER_LEN: usize = 6;
/// Legacy header without the checksum type tag.
pub const HEADER_LEN_NO_CHECKSUM_TYPE: usize = 5;

/// array_id (1) + row_id (2) + data_length (2).
const RECORD_PREFIX_LEN: usize = 5;
const RECORD_CHECKSUM_LEN: usize = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumType {
    TwosComplement,
    Crc16Ccitt,
}

impl ChecksumType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChecksumType::TwosComplement),
            1 => Some(ChecksumType::Crc16Ccitt),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ChecksumType::TwosComplement => 0,
            ChecksumType::Crc16Ccitt => 1,
        }
    }

    /// Record checksums are only ever verified with two's-complement summation.
    pub fn is_supported(self) -> bool {
        self == ChecksumType::TwosComplement
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumType::TwosComplement => write!(f, "2's complement summation"),
            ChecksumType::Crc16Ccitt => write!(f, "CRC-16-CCITT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub silicon_id: u32,
    pub silicon_revision: u8,
    pub checksum_type: ChecksumType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRecord {
    pub array_id: u8,
    pub row_id: u16,
    pub data: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {HEADER_LEN} bytes, got {len}")]
    BadLength { len: usize },

    #[error("unknown checksum type tag 0x{tag:02X}")]
    UnknownChecksumType { tag: u8 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("record too short ({len} bytes)")]
    TooShort { len: usize },

    #[error("declared data length {declared} exceeds the {available} bytes available")]
    Truncated { declared: usize, available: usize },

    #[error("{extra} unexpected byte(s) after the checksum")]
    TrailingBytes { extra: usize },

    #[error("row data of {len} bytes does not fit a 16-bit length field")]
    DataTooLong { len: usize },

    #[error(
        "checksum mismatch for array {array_id} row {row_id}: \
         expected 0x{expected:02X}, computed 0x{computed:02X}"
    )]
    ChecksumMismatch {
        array_id: u8,
        row_id: u16,
        expected: u8,
        computed: u8,
    },
}

/// Decodes the metadata line (silicon id, revision, checksum type).
pub fn decode_header(line: &str) -> Result<Header, HeaderError> {
    let bytes = decode_hex_bytes(line).map_err(HeaderError::InvalidHex)?;

    let checksum_type = match bytes.len() {
        HEADER_LEN => ChecksumType::from_tag(bytes[5])
            .ok_or(HeaderError::UnknownChecksumType { tag: bytes[5] })?,
        HEADER_LEN_NO_CHECKSUM_TYPE => ChecksumType::TwosComplement,
        len => return Err(HeaderError::BadLength { len }),
    };

    Ok(Header {
        silicon_id: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        silicon_revision: bytes[4],
        checksum_type,
    })
}

/// Decodes one flash row line. The caller strips whitespace and the `:` prefix.
pub fn decode_record(line: &str) -> Result<FlashRecord, RecordError> {
    let bytes = decode_hex_bytes(line).map_err(RecordError::InvalidHex)?;

    if bytes.len() < RECORD_PREFIX_LEN + RECORD_CHECKSUM_LEN {
        return Err(RecordError::TooShort { len: bytes.len() });
    }

    let array_id = bytes[0];
    let row_id = u16::from_be_bytes([bytes[1], bytes[2]]);
    let data_length = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;

    let available = bytes.len() - RECORD_PREFIX_LEN - RECORD_CHECKSUM_LEN;
    if data_length > available {
        return Err(RecordError::Truncated {
            declared: data_length,
            available,
        });
    }
    if data_length < available {
        return Err(RecordError::TrailingBytes {
            extra: available - data_length,
        });
    }

    let fields_end = RECORD_PREFIX_LEN + data_length;
    let expected = bytes[fields_end];
    let computed = checksum_twos_complement(&bytes[..fields_end]);
    if expected != computed {
        return Err(RecordError::ChecksumMismatch {
            array_id,
            row_id,
            expected,
            computed,
        });
    }

    Ok(FlashRecord {
        array_id,
        row_id,
        data: bytes[RECORD_PREFIX_LEN..fields_end].to_vec(),
    })
}

/// Encodes a record as an uppercase hex line with a leading `:`.
pub fn encode_record(record: &FlashRecord) -> Result<String, RecordError> {
    let data_length = u16::try_from(record.data.len()).map_err(|_| RecordError::DataTooLong {
        len: record.data.len(),
    })?;

    let mut bytes: Vec<u8> = Vec::with_capacity(RECORD_PREFIX_LEN + record.data.len() + 1);
    bytes.push(record.array_id);
    bytes.extend_from_slice(&record.row_id.to_be_bytes());
    bytes.extend_from_slice(&data_length.to_be_bytes());
    bytes.extend_from_slice(&record.data);
    let cksum = checksum_twos_complement(&bytes);
    bytes.push(cksum);

    let mut s = String::with_capacity(1 + bytes.len() * 2);
    s.push(':');
    for b in bytes {
        s.push_str(&format!("{b:02X}"));
    }
    Ok(s)
}

/// 8-bit two's complement of the byte sum: `sum(bytes) + checksum == 0 (mod 256)`.
pub fn checksum_twos_complement(bytes: &[u8]) -> u8 {
    let sum: u8 = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}

fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    if !s.len().is_multiple_of(2) {
        return Err("odd number of hex digits".to_string());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    for (i, pair) in s.as_bytes().chunks_exact(2).enumerate() {
        let hi = from_hex_digit(pair[0]);
        let lo = from_hex_digit(pair[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
            _ => {
                return Err(format!(
                    "invalid hex digit in {:?} at offset {}",
                    String::from_utf8_lossy(pair),
                    i * 2
                ))
            }
        }
    }
    Ok(out)
}

fn from_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
