//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use std::{fs::File, io::Read, path::Path, vec::Vec};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::sans::{
    check::DeviceIdentity,
    codec::{BcdAscii, BinaryNibble, FieldCodec},
};

use super::{DecodeOptions, Decoded, slice};

extern crate std;

/// Longest dump of any supported format.
const MAX_DUMP_SIZE: usize = {
    let (a, b) = (BinaryNibble::LAYOUT.dump_size, BcdAscii::LAYOUT.dump_size);
    if a > b { a } else { b }
};

/// Errors occurring while decoding from a reader.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An error decoding the bytes read.
    #[error(transparent)]
    Slice(#[from] slice::Error),
}

/// Decode every tour of a dump read from a reader.
///
/// At most one byte more than the longest supported dump is read, so that an
/// oversized input fails validation without being read whole.
///
/// This method is also re-exported as `hacdump::avec::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode(r: &mut impl Read, options: &DecodeOptions) -> Result<Decoded, Error> {
    let dump = read(r)?;
    Ok(slice::decode(&dump, options)?)
}

/// Decode every tour of a dump file.
///
/// Unless `options` carries a fallback year, dumps that store no year date
/// their most recent tour in the year the file was last modified.
///
/// _Requires Cargo feature `std`._
pub fn decode_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Decoded, Error> {
    let mut file = File::open(path)?;

    let options = match (options.fallback_year, modified_year(&file)) {
        (None, Some(year)) => {
            debug!(year, "falling back to the file's modification year");
            options.with_fallback_year(year)
        }
        _ => *options,
    };

    decode(&mut file, &options)
}

/// Check whether a file holds a dump of a supported device.
///
/// _Requires Cargo feature `std`._
pub fn validate_file(path: impl AsRef<Path>) -> Result<DeviceIdentity, Error> {
    let dump = read(&mut File::open(path)?)?;
    Ok(slice::validate(&dump).map_err(slice::Error::from)?)
}

/// The year a file was last modified in, if the platform records it.
fn modified_year(file: &File) -> Option<i32> {
    let modified = file.metadata().ok()?.modified().ok()?;
    Some(OffsetDateTime::from(modified).year())
}

fn read(r: &mut impl Read) -> Result<Vec<u8>, Error> {
    let mut dump = Vec::with_capacity(MAX_DUMP_SIZE);
    r.take(MAX_DUMP_SIZE as u64 + 1).read_to_end(&mut dump)?;
    Ok(dump)
}
