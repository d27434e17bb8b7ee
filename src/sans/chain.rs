//! Walk over the header/link chain, from the most recent tour to the oldest.
//!
//! Every tour in the data region is a header record, a run of data records, a
//! terminal record, and a link record. The header points forward to its link
//! and the link points back to its header. The device writes tours one after
//! the other, so the link closing the previous tour lies just before a header.
//!
//! ```text
//!      next free
//!          v
//! ... AA BB CC DD AA BB BB CC DD .. .. ..
//!     '----------'  '-----------'
//!      older tour    newest tour
//! ```
//!
//! The walk starts at the record before the device's next free record, which
//! must be the newest link, and steps from each header to the link before it.
//! Once the ring has wrapped, the oldest surviving link may point at a header
//! already overwritten by newer records. The walk ends when a link or the
//! header it points at is missing, when it returns to its starting link, or at
//! the iteration cap.

use alloc::vec::Vec;
use core::marker::PhantomData;

use either::Either::{Left, Right};
use tracing::{debug, trace};

use super::{
    codec::FieldCodec,
    cursor::ByteCursor,
    record::{Data, Header, Link, MalformedRecord, Record, RecordKind, Terminal},
    samples::Samples,
};

/// Default number of tours after which a walk gives up.
pub const ITERATION_CAP: usize = 1000;

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    /// The record before the oldest tour is not a link, or the link's header
    /// has been overwritten.
    Exhausted,
    /// The walk returned to the newest link; the ring is full.
    CycleDetected,
    /// The iteration cap was reached.
    IterationCap,
    /// A chain pointer was invalid. Tours before it remain valid.
    Corrupt,
}

/// Start of a tour, with the year inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTime {
    /// Unknown if the dump stores no year and none was supplied.
    pub year: Option<i32>,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// A tour as stored in the data region, before sample reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTour {
    /// Absolute offset of the header record.
    pub header_offset: usize,
    /// Absolute offset of the link record.
    pub link_offset: usize,
    pub header: Header,
    pub link: Link,
    pub start: StartTime,
    pub blocks: Vec<Data>,
    pub terminal: Terminal,
}

impl RawTour {
    /// Reconstruct the samples of this tour.
    pub fn samples<C: FieldCodec>(&self) -> Samples<'_, C> {
        Samples::new(&self.header, &self.blocks, &self.terminal)
    }
}

/// Infers absolute years for tours met in reverse chronological order.
///
/// Headers store no year. Walking backwards, months should not increase, so a
/// month greater than the previous tour's marks a new year's day crossed. A gap
/// of a full year or more between tours goes unnoticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearTracker {
    year: Option<i32>,
    last_month: Option<u8>,
}

impl YearTracker {
    /// Start at the year of the most recent tour, if known.
    pub fn new(year: Option<i32>) -> Self {
        Self {
            year,
            last_month: None,
        }
    }

    /// Observe the month of the next (older) tour, returning its year.
    pub fn observe(&mut self, month: u8) -> Option<i32> {
        if self.last_month.is_some_and(|last| month > last) {
            self.year = self.year.map(|year| year - 1);
        }
        self.last_month = Some(month);

        self.year
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    WalkingLink(usize),
    WalkingHeader { link_offset: usize, link: Link },
    Done(ChainEnd),
    Corrupt,
}

/// Iterator over the tours of a dump, newest first.
///
/// Faults within a tour (its data stream or start time) yield an error for
/// that tour and the walk continues. Faults in the chain pointers yield one
/// error and end the walk with [`ChainEnd::Corrupt`].
#[derive(Debug, Clone)]
pub struct ChainWalker<'a, C> {
    cursor: ByteCursor<'a>,
    next_free: usize,
    initial_link: usize,
    years: YearTracker,
    cap: usize,
    tours: usize,
    state: State,
    _codec: PhantomData<C>,
}

impl<'a, C: FieldCodec> ChainWalker<'a, C> {
    /// Prepare a walk starting before the record at `next_free`.
    ///
    /// Fails if the dump does not hold a whole data region.
    pub fn new(
        dump: &'a [u8],
        next_free: usize,
        year: Option<i32>,
        cap: usize,
    ) -> Result<Self, MalformedRecord> {
        let layout = C::LAYOUT;

        if dump.len() < layout.data_end {
            Err(MalformedRecord::Truncated {
                offset: layout.data_start,
            })?;
        }

        Ok(Self {
            cursor: ByteCursor::new(dump, layout.data_region()),
            next_free,
            initial_link: layout.previous(next_free),
            years: YearTracker::new(year),
            cap,
            tours: 0,
            state: State::Start,
            _codec: PhantomData,
        })
    }

    /// Why the walk stopped, once it has.
    pub fn end(&self) -> Option<ChainEnd> {
        match self.state {
            State::Done(end) => Some(end),
            State::Corrupt => Some(ChainEnd::Corrupt),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Result<RawTour, MalformedRecord>> {
        loop {
            self.state = match self.state {
                State::Start => {
                    if !C::LAYOUT.is_record(self.next_free) {
                        return self.corrupt(MalformedRecord::PointerOutOfRegion {
                            offset: C::LAYOUT.device_data,
                            target: self.next_free,
                        });
                    }
                    State::WalkingLink(self.initial_link)
                }
                State::WalkingLink(link_offset) => match self.walk_link(link_offset) {
                    Ok(Some(link)) => State::WalkingHeader { link_offset, link },
                    Ok(None) => State::Done(ChainEnd::Exhausted),
                    Err(e) => return self.corrupt(e),
                },
                State::WalkingHeader { link_offset, link } => {
                    let header = match self.walk_header(link_offset, &link) {
                        Ok(Some(header)) => header,
                        Ok(None) => {
                            self.state = State::Done(ChainEnd::Exhausted);
                            continue;
                        }
                        Err(e) => return self.corrupt(e),
                    };

                    let tour = self.read_tour(link_offset, link, header);
                    self.state = self.successor(link.header);

                    return Some(tour);
                }
                State::Done(end) => {
                    debug!(?end, tours = self.tours, "chain walk finished");
                    return None;
                }
                State::Corrupt => return None,
            };
        }
    }

    /// Read the record expected to be a link, or `None` past the oldest tour.
    fn walk_link(&mut self, offset: usize) -> Result<Option<Link>, MalformedRecord> {
        let record = Record::<C>::read(&mut self.cursor, offset)?;

        if record.kind() != Some(RecordKind::Link) {
            trace!(offset, "no link before the oldest tour");
            return Ok(None);
        }

        let link = record.as_link()?;

        if !C::LAYOUT.is_record(link.header) {
            Err(MalformedRecord::PointerOutOfRegion {
                offset,
                target: link.header,
            })?;
        }

        Ok(Some(link))
    }

    /// Read the header a link points to, verifying it points back.
    ///
    /// Returns `None` if a newer tour has overwritten the header, leaving only
    /// the tail of the oldest tour.
    fn walk_header(
        &mut self,
        link_offset: usize,
        link: &Link,
    ) -> Result<Option<Header>, MalformedRecord> {
        let record = Record::<C>::read(&mut self.cursor, link.header)?;

        if record.kind() != Some(RecordKind::Header) {
            trace!(offset = link.header, "header of the oldest tour overwritten");
            return Ok(None);
        }

        let header = record.as_header()?;

        if header.link != link_offset {
            Err(MalformedRecord::BrokenLink {
                link: link_offset,
                header: link.header,
                found: header.link,
            })?;
        }

        Ok(Some(header))
    }

    /// Read the body of a verified tour. The cursor rests just past its header.
    fn read_tour(
        &mut self,
        link_offset: usize,
        link: Link,
        header: Header,
    ) -> Result<RawTour, MalformedRecord> {
        let header_offset = link.header;

        let mut blocks = Vec::new();
        let terminal = loop {
            if self.cursor.position() == link_offset || blocks.len() >= C::LAYOUT.capacity() {
                Err(MalformedRecord::Unterminated {
                    header: header_offset,
                    link: link_offset,
                })?;
            }

            match Record::<C>::next(&mut self.cursor)?.as_block()? {
                Left(data) => blocks.push(data),
                Right(terminal) => break terminal,
            }
        };

        let start = self.start_time(header_offset, &header)?;

        debug!(
            header = header_offset,
            blocks = blocks.len(),
            year = ?start.year,
            "read tour"
        );

        Ok(RawTour {
            header_offset,
            link_offset,
            header,
            link,
            start,
            blocks,
            terminal,
        })
    }

    fn start_time(&mut self, offset: usize, header: &Header) -> Result<StartTime, MalformedRecord> {
        let Header {
            month,
            day,
            hour,
            minute,
            ..
        } = *header;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 {
            Err(MalformedRecord::InvalidStartTime {
                offset,
                month,
                day,
                hour,
                minute,
            })?;
        }

        Ok(StartTime {
            year: self.years.observe(month),
            month,
            day,
            hour,
            minute,
        })
    }

    /// The state after a tour whose header lies at `header_offset`.
    fn successor(&mut self, header_offset: usize) -> State {
        self.tours += 1;

        let link = C::LAYOUT.previous(header_offset);

        if link == self.initial_link {
            State::Done(ChainEnd::CycleDetected)
        } else if self.tours >= self.cap {
            State::Done(ChainEnd::IterationCap)
        } else {
            State::WalkingLink(link)
        }
    }

    fn corrupt(&mut self, e: MalformedRecord) -> Option<Result<RawTour, MalformedRecord>> {
        debug!(tours = self.tours, "chain walk stopped at corrupt record");
        self.state = State::Corrupt;
        Some(Err(e))
    }
}

impl<C: FieldCodec> Iterator for ChainWalker<'_, C> {
    type Item = Result<RawTour, MalformedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
