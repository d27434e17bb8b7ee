//! Slice-based decoder implementation.

use alloc::vec::Vec;

use thiserror::Error;
use tracing::{Span, debug, field, instrument, warn};

use crate::sans::{
    chain::{ChainEnd, ChainWalker, RawTour},
    check::{self, ChecksumStatus, DeviceIdentity, ValidationError},
    codec::{BcdAscii, BinaryNibble, FieldCodec},
    device::{Encoding, Hardware},
    record::{Header, MalformedRecord},
};

use super::{ChecksumPolicy, DecodeOptions, Decoded, Diagnostic, Sample, Tour};

/// Errors occurring while decoding from a slice.
#[derive(Debug, Error)]
pub enum Error {
    /// The slice is not a dump of a supported device.
    #[error("Invalid dump: {0}")]
    Validation(#[from] ValidationError),
    /// The device data block cannot be decoded.
    #[error("Malformed device data: {0}")]
    Device(MalformedRecord),
    /// Calculated and found checksum values do not match.
    #[error("Calculated ({calculated}) and found ({found}) checksum values do not match.")]
    ChecksumMismatch { found: u16, calculated: u16 },
    /// The checksum cannot be computed.
    #[error("Unreadable checksum word at offset {offset}.")]
    ChecksumUnreadable { offset: usize },
}

/// Check whether a slice holds a dump of a supported device.
///
/// This method is also re-exported as `hacdump::avec::validate`.
pub fn validate(dump: &[u8]) -> Result<DeviceIdentity, ValidationError> {
    check::validate(dump)
}

/// Decode every tour of a dump held in a slice.
///
/// This method is also re-exported as `hacdump::avec::decode_slice`.
#[instrument(level = "debug", skip_all, fields(len = dump.len(), encoding = field::Empty))]
pub fn decode(dump: &[u8], options: &DecodeOptions) -> Result<Decoded, Error> {
    let identity = check::validate(dump)?;
    Span::current().record("encoding", field::debug(&identity.encoding));

    match identity.encoding {
        Encoding::Binary => decode_with::<BinaryNibble>(dump, identity, options),
        Encoding::BcdAscii => decode_with::<BcdAscii>(dump, identity, options),
    }
}

fn decode_with<C: FieldCodec>(
    dump: &[u8],
    identity: DeviceIdentity,
    options: &DecodeOptions,
) -> Result<Decoded, Error> {
    let mut diagnostics = Vec::new();

    let checksum = match options.checksum {
        ChecksumPolicy::Ignore => None,
        policy => {
            let status = check::checksum(dump, identity.encoding);
            let enforce = policy == ChecksumPolicy::Enforce;

            match status {
                ChecksumStatus::Valid => {}
                ChecksumStatus::Mismatch { found, calculated } => {
                    if enforce {
                        Err(Error::ChecksumMismatch { found, calculated })?;
                    }
                    warn!(found, calculated, "checksum mismatch");
                    diagnostics.push(Diagnostic::ChecksumMismatch { found, calculated });
                }
                ChecksumStatus::Unreadable { offset } => {
                    if enforce {
                        Err(Error::ChecksumUnreadable { offset })?;
                    }
                    warn!(offset, "unreadable checksum");
                    diagnostics.push(Diagnostic::ChecksumUnreadable { offset });
                }
            }

            Some(status)
        }
    };

    let device = C::device_data(dump).map_err(Error::Device)?;
    let year = options.year_for(&device);

    if year.is_none() {
        warn!("dump stores no year and none was given");
        diagnostics.push(Diagnostic::UnknownYear);
    }

    let mut walker = ChainWalker::<C>::new(dump, device.next_free, year, options.iteration_cap)
        .map_err(Error::Device)?;

    let mut tours = Vec::new();

    for tour in &mut walker {
        match tour {
            Ok(raw) => tours.extend(build::<C>(raw, identity.hardware)),
            Err(e) => {
                warn!(%e, "malformed record");
                diagnostics.push(Diagnostic::MalformedRecord(e));
            }
        }
    }

    let end = walker.end().unwrap_or(ChainEnd::Exhausted);
    debug!(tours = tours.len(), ?end, "decoded dump");

    Ok(Decoded {
        identity,
        device,
        tours,
        diagnostics,
        end,
        checksum,
    })
}

/// Reconstruct a tour, or `None` if it holds no samples.
fn build<C: FieldCodec>(raw: RawTour, hardware: Hardware) -> Option<Tour> {
    let samples: Vec<Sample> = raw.samples::<C>().collect();

    if samples.is_empty() {
        debug!(header = raw.header_offset, "skipping tour without samples");
        return None;
    }

    let Header {
        profile,
        interval,
        start_distance,
        start_altitude,
        start_pulse,
        ..
    } = raw.header;

    Some(Tour {
        start: raw.start,
        hardware,
        profile,
        profile_name: C::profile_name(profile),
        interval,
        start_distance,
        start_pulse,
        start_altitude,
        samples,
        link_totals: raw.link.totals,
        header_offset: raw.header_offset,
    })
}
