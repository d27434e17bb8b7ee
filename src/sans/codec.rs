//! Physical encodings of the shared record layout.
//!
//! Both device families store the same logical records: headers, links, and
//! blocks of six packed sample words. They differ only in how fields are laid
//! out in bytes. A [`FieldCodec`] captures one such layout, and is selected
//! once per dump from its hardware id (see [`crate::sans::check`]).

mod bcd;
mod binary;

use core::{fmt::Debug, ops::Range};

use tartan_bitfield::bitfield;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub use bcd::BcdAscii;
pub use binary::BinaryNibble;

use super::{
    check::ChecksumStatus,
    device::{DeviceData, Encoding},
    record::{Data, Header, Link, MalformedRecord, RecordKind, Terminal},
};

/// Fixed positions and sizes of a dump format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Total length of a dump in bytes.
    pub dump_size: usize,
    /// Shortest length accepted as a dump of this format.
    pub min_dump_size: usize,
    /// Absolute offset of the device data block.
    pub device_data: usize,
    /// Absolute offset of the first record of the data region.
    pub data_start: usize,
    /// Absolute offset just past the last record of the data region.
    pub data_end: usize,
    /// Size of one record in bytes.
    pub record_size: usize,
    /// Added to stored record pointers to obtain absolute offsets.
    pub pointer_base: usize,
}

impl Layout {
    /// Whether a dump of `len` bytes may be in this format.
    pub const fn accepts(&self, len: usize) -> bool {
        len >= self.min_dump_size && len <= self.dump_size
    }

    /// The circular data region.
    pub const fn data_region(&self) -> Range<usize> {
        self.data_start..self.data_end
    }

    /// Number of records in the data region.
    pub const fn capacity(&self) -> usize {
        (self.data_end - self.data_start) / self.record_size
    }

    /// Whether an absolute offset addresses the start of a record.
    pub const fn is_record(&self, offset: usize) -> bool {
        offset >= self.data_start
            && offset < self.data_end
            && (offset - self.data_start) % self.record_size == 0
    }

    /// Offset of the record before `offset`, wrapping to the last record.
    pub const fn previous(&self, offset: usize) -> usize {
        if offset <= self.data_start {
            self.data_end - self.record_size
        } else {
            offset - self.record_size
        }
    }
}

/// One physical encoding of the record layout.
pub trait FieldCodec: Debug + Default + Copy {
    /// Encoding tag of this codec.
    const ENCODING: Encoding;
    /// Positions and sizes of dumps in this encoding.
    const LAYOUT: Layout;

    /// Bytes of one record.
    type Raw: FromBytes + IntoBytes + KnownLayout + Immutable + Copy + Debug;

    /// Read the hardware id from the header region, if legible.
    fn hardware_id(dump: &[u8]) -> Option<u16>;

    /// Decode the device data block of the header region.
    fn device_data(dump: &[u8]) -> Result<DeviceData, MalformedRecord>;

    /// Compare the word-sum of a dump with its stored checksum.
    fn checksum(dump: &[u8]) -> ChecksumStatus;

    /// Classify a record by its type tag.
    fn classify(raw: &Self::Raw) -> Option<RecordKind>;

    /// Decode a header record found at `offset`.
    fn header(raw: &Self::Raw, offset: usize) -> Result<Header, MalformedRecord>;

    /// Decode a link record found at `offset`.
    fn link(raw: &Self::Raw, offset: usize) -> Result<Link, MalformedRecord>;

    /// Decode a data record found at `offset`.
    fn data(raw: &Self::Raw, offset: usize) -> Result<Data, MalformedRecord>;

    /// Decode a terminal record found at `offset`.
    fn terminal(raw: &Self::Raw, offset: usize) -> Result<Terminal, MalformedRecord>;

    /// Name of a device profile.
    fn profile_name(profile: u8) -> &'static str;

    /// Pulse change of a sample word, in beats per minute.
    fn delta_pulse(word: u16) -> i16 {
        pulse_delta(word)
    }

    /// Altitude change of a sample word, in metres.
    fn delta_altitude(word: u16) -> i16 {
        altitude_delta(word)
    }

    /// Distance travelled during a sample word, in metres.
    fn delta_distance(word: u16) -> i32 {
        distance_delta(word)
    }
}

bitfield! {
    struct SampleWord(u16) {
        [0..6] distance: u8,
        [6..12] altitude: u8,
        [12..16] pulse: u8,
    }
}

/// Magnitude past which altitude deltas are stored compressed.
pub const ALTITUDE_LINEAR_LIMIT: i16 = 16;
/// Scale of compressed altitude steps.
pub const ALTITUDE_COMPRESSION: i16 = 7;

/// Decode the signed 4-bit pulse field, which counts steps of two.
pub fn pulse_delta(word: u16) -> i16 {
    sign_extend(SampleWord(word).pulse(), 4) * 2
}

/// Decode the signed 6-bit altitude field, expanding compressed values.
pub fn altitude_delta(word: u16) -> i16 {
    expand_altitude(sign_extend(SampleWord(word).altitude(), 6))
}

/// Decode the unsigned 6-bit distance field, which counts steps of ten metres.
pub fn distance_delta(word: u16) -> i32 {
    SampleWord(word).distance() as i32 * 10
}

/// Expand a stored altitude step: each unit past the limit counts seven metres.
pub fn expand_altitude(v: i16) -> i16 {
    if v.abs() > ALTITUDE_LINEAR_LIMIT {
        let excess = v.abs() - ALTITUDE_LINEAR_LIMIT;
        v.signum() * (ALTITUDE_LINEAR_LIMIT + excess * ALTITUDE_COMPRESSION)
    } else {
        v
    }
}

fn sign_extend(field: u8, bits: u32) -> i16 {
    let field = field as i16;
    if field & (1 << (bits - 1)) != 0 {
        field | (-1 << bits)
    } else {
        field
    }
}
