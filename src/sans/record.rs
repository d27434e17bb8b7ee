//! Classification and typed access to single records.

use core::fmt;

use either::Either::{self, Left, Right};
use thiserror::Error;
use tinyvec::ArrayVec;
use zerocopy::{FromZeros, IntoBytes};

use super::{
    codec::FieldCodec,
    cursor::{ByteCursor, CursorError},
};

/// Number of sample words packed into a data or terminal record.
pub const BLOCK_SAMPLES: usize = 6;

/// The type of a record, given by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Start of a tour (`AA`).
    Header,
    /// Samples of a tour (`BB`).
    Data,
    /// Final samples of a tour (`CC`).
    Terminal,
    /// End of a tour, pointing back at its header (`DD`).
    Link,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Data => "data",
            Self::Terminal => "terminal",
            Self::Link => "link",
        })
    }
}

/// A record that cannot be decoded where it was found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    /// The record has a different kind than its position requires.
    #[error("Expected a {expected} record at offset {offset}, found {found:?}.")]
    UnexpectedKind {
        offset: usize,
        expected: RecordKind,
        found: Option<RecordKind>,
    },
    /// A digit field holds characters outside its radix.
    #[error("Invalid digits in field at offset {offset}.")]
    InvalidDigits { offset: usize },
    /// A record pointer does not address a record of the data region.
    #[error("Record at offset {offset} points to {target}, outside the data region.")]
    PointerOutOfRegion { offset: usize, target: usize },
    /// A header does not point back to the link that led to it.
    #[error("Header at offset {header} points to {found}, not to its link at {link}.")]
    BrokenLink {
        link: usize,
        header: usize,
        found: usize,
    },
    /// A tour reaches its own link without a terminal record.
    #[error("Tour at offset {header} reaches its link at {link} without a terminal record.")]
    Unterminated { header: usize, link: usize },
    /// A header stores a date or time that cannot exist.
    #[error(
        "Header at offset {offset} starts at an impossible time ({month:02}-{day:02} {hour:02}:{minute:02})."
    )]
    InvalidStartTime {
        offset: usize,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    },
    /// A fixed-position block extends past the end of the dump.
    #[error("Block at offset {offset} extends past the end of the dump.")]
    Truncated { offset: usize },
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Fields of a header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Device profile id.
    pub profile: u8,
    /// Seconds between samples.
    pub interval: u16,
    /// Absolute offset of the link closing this tour.
    pub link: usize,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// Odometer reading at the start, in metres.
    pub start_distance: u32,
    /// Altitude at the start, in metres.
    pub start_altitude: i16,
    /// Pulse at the start, in beats per minute.
    pub start_pulse: i16,
}

/// Totals a device stores when closing a tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTotals {
    pub distance: u16,
    pub altitude_up: u16,
    pub altitude_down: u16,
}

/// Fields of a link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Absolute offset of the header opening this tour.
    pub header: usize,
    pub totals: Option<LinkTotals>,
}

/// Fields shared by data and terminal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    /// Degrees Celsius.
    pub temperature: i8,
    /// Revolutions per minute.
    pub cadence: u8,
    /// Marker set during the first slice of the block.
    pub marker: Option<u8>,
    /// Packed sample words.
    pub words: [u16; BLOCK_SAMPLES],
}

/// A data record: six full slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Data(pub Block);

/// A terminal record: the final, possibly partial, slices of a tour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    pub block: Block,
    /// Seconds into this block at which recording stopped.
    pub end: u8,
}

/// Time, marker and word of one slice in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    /// Seconds since the previous slice.
    pub time: u16,
    pub marker: Option<u8>,
    pub word: u16,
}

impl Block {
    fn slices(
        &self,
        count: usize,
        last_time: u16,
        interval: u16,
    ) -> ArrayVec<[Slice; BLOCK_SAMPLES]> {
        (0..count)
            .map(|i| Slice {
                time: if i + 1 == count { last_time } else { interval },
                marker: if i == 0 { self.marker } else { None },
                word: self.words[i],
            })
            .collect()
    }
}

impl Data {
    /// The six slices of this block.
    pub fn slices(&self, interval: u16) -> ArrayVec<[Slice; BLOCK_SAMPLES]> {
        self.0.slices(BLOCK_SAMPLES, interval, interval)
    }
}

impl Terminal {
    /// Number of slices holding recorded data.
    ///
    /// The slice running at `end` counts as recorded, even when `end` falls on
    /// a slice boundary. A terminal ending at zero holds no data. The remaining
    /// words of the block are padding.
    pub fn sample_count(&self, interval: u16) -> usize {
        if self.end == 0 {
            return 0;
        }

        (self.end as usize / interval.max(1) as usize + 1).min(BLOCK_SAMPLES)
    }

    /// Seconds covered by the final slice.
    pub fn last_time(&self, interval: u16) -> u16 {
        self.end as u16 % interval.max(1)
    }

    /// The recorded slices of this block.
    pub fn slices(&self, interval: u16) -> ArrayVec<[Slice; BLOCK_SAMPLES]> {
        self.block.slices(
            self.sample_count(interval),
            self.last_time(interval),
            interval,
        )
    }
}

/// A single record read from the data region.
#[derive(Debug, Clone, Copy)]
pub struct Record<C: FieldCodec> {
    offset: usize,
    raw: C::Raw,
}

impl<C: FieldCodec> Record<C> {
    /// Read the record at `offset`, leaving the cursor just past it.
    pub fn read(cursor: &mut ByteCursor, offset: usize) -> Result<Self, MalformedRecord> {
        cursor.seek(offset);
        Self::next(cursor)
    }

    /// Read the record at the cursor position, advancing past it.
    pub fn next(cursor: &mut ByteCursor) -> Result<Self, MalformedRecord> {
        let offset = cursor.position();

        let mut raw = C::Raw::new_zeroed();
        cursor.read_into(raw.as_mut_bytes())?;

        Ok(Self { offset, raw })
    }

    /// Absolute offset of this record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn raw(&self) -> &C::Raw {
        &self.raw
    }

    /// The kind given by this record's tag, if recognised.
    pub fn kind(&self) -> Option<RecordKind> {
        let kind = C::classify(&self.raw);
        tracing::trace!("{:?} record at {}", kind, self.offset);
        kind
    }

    fn expect(&self, expected: RecordKind) -> Result<(), MalformedRecord> {
        match self.kind() {
            Some(kind) if kind == expected => Ok(()),
            found => Err(MalformedRecord::UnexpectedKind {
                offset: self.offset,
                expected,
                found,
            }),
        }
    }

    pub fn as_header(&self) -> Result<Header, MalformedRecord> {
        self.expect(RecordKind::Header)?;
        C::header(&self.raw, self.offset)
    }

    pub fn as_link(&self) -> Result<Link, MalformedRecord> {
        self.expect(RecordKind::Link)?;
        C::link(&self.raw, self.offset)
    }

    pub fn as_data(&self) -> Result<Data, MalformedRecord> {
        self.expect(RecordKind::Data)?;
        C::data(&self.raw, self.offset)
    }

    pub fn as_terminal(&self) -> Result<Terminal, MalformedRecord> {
        self.expect(RecordKind::Terminal)?;
        C::terminal(&self.raw, self.offset)
    }

    /// Decode a record expected to belong to the body of a tour.
    pub fn as_block(&self) -> Result<Either<Data, Terminal>, MalformedRecord> {
        match self.kind() {
            Some(RecordKind::Data) => Ok(Left(C::data(&self.raw, self.offset)?)),
            Some(RecordKind::Terminal) => Ok(Right(C::terminal(&self.raw, self.offset)?)),
            found => Err(MalformedRecord::UnexpectedKind {
                offset: self.offset,
                expected: RecordKind::Data,
                found,
            }),
        }
    }
}
