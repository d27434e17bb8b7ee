//! Format recognition and the word-sum checksum.

use thiserror::Error;

use super::{
    codec::{BcdAscii, BinaryNibble, FieldCodec},
    device::{Encoding, Hardware},
};

/// Export format tag at the start of every dump.
pub const MAGIC: &[u8; 4] = b"AFRO";

/// An error recognising a dump.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Incorrect format tag or dump length.
    #[error("Unrecognized dump format.")]
    UnrecognizedFormat,
    /// Unknown hardware id.
    #[error("Unsupported hardware ({0:#06x}).")]
    UnsupportedHardware(u16),
}

/// The device a dump was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub hardware: Hardware,
    pub encoding: Encoding,
}

/// Recognise the format and hardware of a dump.
///
/// Only the format tag, the dump length, and the hardware id are inspected, so
/// this is cheap enough to run over arbitrary files.
pub fn validate(dump: &[u8]) -> Result<DeviceIdentity, ValidationError> {
    let tag = dump.get(..MAGIC.len());

    if !tag.is_some_and(|tag| tag.eq_ignore_ascii_case(MAGIC)) {
        Err(ValidationError::UnrecognizedFormat)?;
    }

    let (encoding, id) = match dump.len() {
        n if BinaryNibble::LAYOUT.accepts(n) => {
            (Encoding::Binary, BinaryNibble::hardware_id(dump))
        }
        n if BcdAscii::LAYOUT.accepts(n) => (Encoding::BcdAscii, BcdAscii::hardware_id(dump)),
        _ => Err(ValidationError::UnrecognizedFormat)?,
    };

    let id = id.ok_or(ValidationError::UnrecognizedFormat)?;
    let hardware =
        Hardware::from_id(encoding, id).ok_or(ValidationError::UnsupportedHardware(id))?;

    Ok(DeviceIdentity { hardware, encoding })
}

/// Outcome of comparing a dump's word-sum with its trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    Mismatch { found: u16, calculated: u16 },
    /// A word could not be parsed; only possible for digit encodings.
    Unreadable { offset: usize },
}

impl ChecksumStatus {
    pub fn compare(found: u16, calculated: u16) -> Self {
        if found == calculated {
            Self::Valid
        } else {
            Self::Mismatch { found, calculated }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Recompute the checksum of a dump in the given encoding.
pub fn checksum(dump: &[u8], encoding: Encoding) -> ChecksumStatus {
    match encoding {
        Encoding::Binary => BinaryNibble::checksum(dump),
        Encoding::BcdAscii => BcdAscii::checksum(dump),
    }
}

/// Accumulate words into a wrapping 16-bit sum.
pub fn word_sum(init: u16, words: impl IntoIterator<Item = u16>) -> u16 {
    words.into_iter().fold(init, u16::wrapping_add)
}
