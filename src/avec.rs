//! Convenience interfaces for decoding whole dumps.
//!
//! The functions in this module decode dumps from data slices and (with the
//! `std` feature) readers and files, collecting every tour into a [`Decoded`]
//! document. Problems that do not prevent decoding are collected as
//! [`Diagnostic`]s alongside the tours, and logged through [`tracing`].
//!
//! ```
//! let dump = std::fs::read("tours.dat")?;
//! let decoded = hacdump::avec::decode_slice(&dump, &DecodeOptions::default())?;
//!
//! for tour in &decoded.tours {
//!     println!("{:?}: {} samples", tour.start, tour.samples.len());
//! }
//! ```

use alloc::{format, vec::Vec};

use crate::sans::{
    chain::{ChainEnd, ITERATION_CAP, StartTime},
    check::{ChecksumStatus, DeviceIdentity},
    device::{DeviceData, Hardware},
    record::{LinkTotals, MalformedRecord},
};

pub use crate::sans::samples::Sample;

#[cfg(feature = "std")]
pub mod reader;
pub mod slice;

#[cfg(feature = "std")]
pub use reader::{decode as decode_reader, decode_file, validate_file};
pub use slice::{decode as decode_slice, validate};

/// A decoded tour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tour {
    pub start: StartTime,
    pub hardware: Hardware,
    /// Device profile id, with its name as the device displays it.
    pub profile: u8,
    pub profile_name: &'static str,
    /// Seconds between samples.
    pub interval: u16,
    /// Odometer reading at the start, in metres.
    pub start_distance: u32,
    pub start_pulse: i16,
    pub start_altitude: i16,
    /// Samples in forward time order, starting at zero elapsed time.
    pub samples: Vec<Sample>,
    /// Totals stored by the device when closing the tour, if it stores any.
    pub link_totals: Option<LinkTotals>,
    /// Absolute offset of the header record in the dump.
    pub header_offset: usize,
}

/// Channels of a tour that carry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels {
    pub distance: bool,
    pub altitude: bool,
    pub pulse: bool,
    pub cadence: bool,
}

impl Tour {
    /// Seconds from the first to the last sample.
    pub fn elapsed(&self) -> u32 {
        self.samples.iter().map(|s| s.time as u32).sum()
    }

    /// Metres travelled over all samples.
    pub fn distance(&self) -> i64 {
        self.samples.iter().map(|s| s.distance as i64).sum()
    }

    /// Which channels hold any non-zero value.
    pub fn channels(&self) -> Channels {
        self.samples
            .iter()
            .fold(Channels::default(), |c, s| Channels {
                distance: c.distance || s.distance != 0,
                altitude: c.altitude || s.altitude != 0,
                pulse: c.pulse || s.pulse != 0,
                cadence: c.cadence || s.cadence != 0,
            })
    }

    /// A numeric identifier derived from the tour's content.
    ///
    /// The decimal digits of the start year, month, day, hour, and minute are
    /// concatenated with those of the start distance. If the result does not
    /// fit, only the first five digits of the distance are used. Tours of an
    /// unknown year have no identifier.
    pub fn tour_id(&self) -> Option<i64> {
        let StartTime {
            year,
            month,
            day,
            hour,
            minute,
        } = self.start;
        let year = year?;

        let prefix = format!("{year}{month}{day}{hour}{minute}");
        let key = format!("{}", self.start_distance);

        format!("{prefix}{key}")
            .parse()
            .or_else(|_| format!("{prefix}{}", &key[..key.len().min(5)]).parse())
            .ok()
    }
}

/// A problem that did not prevent decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A tour, or the chain leading to older tours, could not be decoded.
    MalformedRecord(MalformedRecord),
    /// The stored checksum does not match the dump.
    ChecksumMismatch { found: u16, calculated: u16 },
    /// The checksum could not be computed.
    ChecksumUnreadable { offset: usize },
    /// The dump stores no year and none was supplied, so tours carry none.
    UnknownYear,
}

/// A decoded dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub identity: DeviceIdentity,
    pub device: DeviceData,
    /// Tours, newest first.
    pub tours: Vec<Tour>,
    pub diagnostics: Vec<Diagnostic>,
    /// Why the walk over the tours stopped.
    pub end: ChainEnd,
    /// Outcome of the checksum, unless ignored.
    pub checksum: Option<ChecksumStatus>,
}

/// How to treat a checksum mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Skip the checksum.
    Ignore,
    /// Record a diagnostic and continue.
    #[default]
    Warn,
    /// Fail the decode.
    Enforce,
}

/// Options controlling a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Year of the most recent tour, in place of the transfer year.
    pub reference_year: Option<i32>,
    /// Year of the most recent tour for dumps that store no transfer year.
    ///
    /// [`decode_file`] fills this in from the file's modification time.
    pub fallback_year: Option<i32>,
    pub checksum: ChecksumPolicy,
    /// Number of tours after which the walk stops.
    pub iteration_cap: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            reference_year: None,
            fallback_year: None,
            checksum: ChecksumPolicy::default(),
            iteration_cap: ITERATION_CAP,
        }
    }
}

impl DecodeOptions {
    pub fn with_reference_year(self, year: i32) -> Self {
        Self {
            reference_year: Some(year),
            ..self
        }
    }

    pub fn with_fallback_year(self, year: i32) -> Self {
        Self {
            fallback_year: Some(year),
            ..self
        }
    }

    /// The year of the most recent tour of a dump with the given device data.
    pub fn year_for(&self, device: &DeviceData) -> Option<i32> {
        self.reference_year
            .or(device.transfer.map(|transfer| transfer.year))
            .or(self.fallback_year)
    }

    pub fn with_checksum(self, checksum: ChecksumPolicy) -> Self {
        Self { checksum, ..self }
    }

    pub fn with_iteration_cap(self, iteration_cap: usize) -> Self {
        Self {
            iteration_cap,
            ..self
        }
    }
}
