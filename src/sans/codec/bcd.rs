//! ASCII digit encoding, written by HAC4 devices.
//!
//! Every field is a five byte chunk: four ASCII digits followed by a separator.
//! Record pointers are the exception, using all five bytes as hex digits.
//! Counters and sensor values are hexadecimal, while dates and times are
//! binary-coded decimal.

use zerocopy::FromBytes;

use crate::sans::{
    check::ChecksumStatus,
    cursor::ByteCursor,
    device::{DeviceData, DeviceTotals, Encoding, TransferDate},
    record::{BLOCK_SAMPLES, Block, Data, Header, Link, MalformedRecord, RecordKind, Terminal},
};

use super::{FieldCodec, Layout};

const CHUNK: usize = 5;

const DEVICE_DATA: usize = 645;
const DATA_START: usize = 765;
const TRAILER: usize = 81_925;

const RECORD_SIZE: usize = 8 * CHUNK;

/// Recording interval; not stored by the device.
const INTERVAL: u16 = 20;

const _: () = assert!((TRAILER - DATA_START) % RECORD_SIZE == 0);

/// ASCII hex and decimal digits, one field per chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct BcdAscii;

type Chunk = [u8; CHUNK];

#[repr(C)]
#[derive(FromBytes)]
struct DeviceBlock {
    _hardware: Chunk,
    year: Chunk,
    date: Chunk,
    next_free: Chunk,
    wheel_perimeter: Chunk,
    weight: Chunk,
    altitude_up: Chunk,
    altitude_down: Chunk,
    hours: Chunk,
    minutes: Chunk,
}

#[repr(C)]
#[derive(FromBytes)]
struct HeaderRecord {
    kind: Chunk,
    link: Chunk,
    time: Chunk,
    date: Chunk,
    distance: Chunk,
    _reserved: Chunk,
    altitude: Chunk,
    pulse: Chunk,
}

#[repr(C)]
#[derive(FromBytes)]
struct BlockRecord {
    kind: Chunk,
    marker: Chunk,
    words: [Chunk; BLOCK_SAMPLES],
}

#[repr(C)]
#[derive(FromBytes)]
struct LinkRecord {
    _kind: Chunk,
    header: Chunk,
    _reserved: [Chunk; 6],
}

/// Parse a run of ASCII digits found at `offset`.
fn digits(field: &[u8], radix: u32, offset: usize) -> Result<u32, MalformedRecord> {
    field
        .iter()
        .try_fold(0u32, |value, &b| {
            let digit = (b as char).to_digit(radix)?;
            value.checked_mul(radix)?.checked_add(digit)
        })
        .filter(|_| !field.is_empty())
        .ok_or(MalformedRecord::InvalidDigits { offset })
}

/// Parse the four-digit hex word of a chunk.
fn word(chunk: &Chunk, offset: usize) -> Result<u16, MalformedRecord> {
    Ok(digits(&chunk[..4], 16, offset)? as u16)
}

/// Parse a chunk holding two-digit fields.
fn pair(chunk: &Chunk, radix: u32, offset: usize) -> Result<(u8, u8), MalformedRecord> {
    Ok((
        digits(&chunk[..2], radix, offset)? as u8,
        digits(&chunk[2..4], radix, offset)? as u8,
    ))
}

impl BcdAscii {
    /// Decode the fields shared by data and terminal records, returning the
    /// raw marker byte alongside.
    fn block(raw: &[u8; RECORD_SIZE], offset: usize) -> Result<(Block, u8), MalformedRecord> {
        let BlockRecord {
            kind,
            marker,
            words,
        } = zerocopy::transmute!(*raw);

        let temperature = digits(&kind[..2], 16, offset)? as u8 as i8;
        let (marker, cadence) = pair(&marker, 16, offset + CHUNK)?;

        let mut block = Block {
            temperature,
            cadence,
            marker: None,
            words: [0; BLOCK_SAMPLES],
        };
        for (i, chunk) in words.iter().enumerate() {
            block.words[i] = word(chunk, offset + (2 + i) * CHUNK)?;
        }

        Ok((block, marker))
    }
}

impl FieldCodec for BcdAscii {
    const ENCODING: Encoding = Encoding::BcdAscii;
    const LAYOUT: Layout = Layout {
        dump_size: TRAILER + CHUNK,
        min_dump_size: TRAILER + CHUNK,
        device_data: DEVICE_DATA,
        data_start: DATA_START,
        data_end: TRAILER,
        record_size: RECORD_SIZE,
        pointer_base: 0,
    };

    type Raw = [u8; RECORD_SIZE];

    fn hardware_id(dump: &[u8]) -> Option<u16> {
        let chunk = dump.get(DEVICE_DATA..DEVICE_DATA + 4)?;
        digits(chunk, 16, DEVICE_DATA).ok().map(|id| id as u16)
    }

    fn device_data(dump: &[u8]) -> Result<DeviceData, MalformedRecord> {
        let (block, _) = dump
            .get(DEVICE_DATA..)
            .and_then(|r| DeviceBlock::read_from_prefix(r).ok())
            .ok_or(MalformedRecord::Truncated {
                offset: DEVICE_DATA,
            })?;

        let field = |i: usize| DEVICE_DATA + i * CHUNK;

        let year = digits(&block.year[..4], 10, field(1))?;
        let (month, day) = pair(&block.date, 10, field(2))?;
        let next_free = digits(&block.next_free, 16, field(3))? as usize;

        let (hours_high, hours_low) = pair(&block.hours, 10, field(8))?;
        let (minutes, seconds) = pair(&block.minutes, 10, field(9))?;
        let hours = hours_high as u32 * 100 + hours_low as u32;

        Ok(DeviceData {
            transfer: Some(TransferDate {
                year: year as i32,
                month,
                day,
            }),
            next_free,
            totals: Some(DeviceTotals {
                wheel_perimeter: word(&block.wheel_perimeter, field(4))?,
                weight: word(&block.weight, field(5))?,
                altitude_up: word(&block.altitude_up, field(6))? as u32,
                altitude_down: word(&block.altitude_down, field(7))? as u32,
                travel_time: hours * 3600 + minutes as u32 * 60 + seconds as u32,
            }),
        })
    }

    fn checksum(dump: &[u8]) -> ChecksumStatus {
        let found = match dump
            .get(TRAILER..TRAILER + 4)
            .and_then(|chunk| digits(chunk, 16, TRAILER).ok())
        {
            Some(found) => found as u16,
            None => return ChecksumStatus::Unreadable { offset: TRAILER },
        };

        // The magic chunk is not part of the sum.
        let mut cursor = ByteCursor::new(dump, CHUNK..TRAILER);
        let mut calculated = 0u16;
        for _ in 0..(TRAILER - CHUNK) / CHUNK {
            let offset = cursor.position();
            match cursor.take::<CHUNK>().map(|chunk| word(&chunk, offset)) {
                Ok(Ok(value)) => calculated = calculated.wrapping_add(value),
                _ => return ChecksumStatus::Unreadable { offset },
            }
        }

        ChecksumStatus::compare(found, calculated)
    }

    fn classify(raw: &Self::Raw) -> Option<RecordKind> {
        match [raw[2].to_ascii_uppercase(), raw[3].to_ascii_uppercase()] {
            [b'A', b'A'] => Some(RecordKind::Header),
            [b'B', b'B'] => Some(RecordKind::Data),
            [b'C', b'C'] => Some(RecordKind::Terminal),
            [b'D', b'D'] => Some(RecordKind::Link),
            _ => None,
        }
    }

    fn header(raw: &Self::Raw, offset: usize) -> Result<Header, MalformedRecord> {
        let HeaderRecord {
            kind,
            link,
            time,
            date,
            distance,
            altitude,
            pulse,
            ..
        } = zerocopy::transmute!(*raw);

        let field = |i: usize| offset + i * CHUNK;

        let (hour, minute) = pair(&time, 10, field(2))?;
        let (month, day) = pair(&date, 10, field(3))?;

        Ok(Header {
            profile: digits(&kind[..2], 16, field(0))? as u8,
            interval: INTERVAL,
            link: digits(&link, 16, field(1))? as usize,
            month,
            day,
            hour,
            minute,
            start_distance: word(&distance, field(4))? as u32,
            start_altitude: word(&altitude, field(6))? as i16,
            start_pulse: word(&pulse, field(7))? as i16,
        })
    }

    fn link(raw: &Self::Raw, offset: usize) -> Result<Link, MalformedRecord> {
        let LinkRecord { header, .. } = zerocopy::transmute!(*raw);

        Ok(Link {
            header: digits(&header, 16, offset + CHUNK)? as usize,
            totals: None,
        })
    }

    fn data(raw: &Self::Raw, offset: usize) -> Result<Data, MalformedRecord> {
        let (block, marker) = Self::block(raw, offset)?;

        Ok(Data(Block {
            marker: (marker != 0).then_some(marker),
            ..block
        }))
    }

    fn terminal(raw: &Self::Raw, offset: usize) -> Result<Terminal, MalformedRecord> {
        // The marker field holds the end of recording instead.
        let (block, end) = Self::block(raw, offset)?;

        Ok(Terminal { block, end })
    }

    fn profile_name(profile: u8) -> &'static str {
        match profile {
            0x81 => "jogging",
            0x91 => "ski",
            0xA1 => "bike",
            0xB1 => "ski-bike",
            _ => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chunks: [&[u8; 5]; 8]) -> [u8; RECORD_SIZE] {
        let mut raw = [0; RECORD_SIZE];
        for (i, chunk) in chunks.iter().enumerate() {
            raw[i * CHUNK..(i + 1) * CHUNK].copy_from_slice(*chunk);
        }
        raw
    }

    #[test]
    fn layout() {
        let layout = BcdAscii::LAYOUT;

        assert_eq!(layout.dump_size, 81_930);
        assert_eq!(layout.capacity(), 2029);
        assert_eq!(layout.previous(DATA_START), TRAILER - RECORD_SIZE);
    }

    #[test]
    fn decodes_header() {
        let raw = record([
            b"A1AA\r", b"00355", b"0715\r", b"0412\r", b"2710\r", b"0000\r", b"012C\r",
            b"0078\r",
        ]);

        assert_eq!(BcdAscii::classify(&raw), Some(RecordKind::Header));

        let header = BcdAscii::header(&raw, 765).unwrap();
        assert_eq!(
            header,
            Header {
                profile: 0xA1,
                interval: 20,
                link: 0x355,
                month: 4,
                day: 12,
                hour: 7,
                minute: 15,
                start_distance: 10_000,
                start_altitude: 300,
                start_pulse: 120,
            }
        );
        assert_eq!(BcdAscii::profile_name(header.profile), "bike");
    }

    #[test]
    fn negative_start_altitude() {
        let raw = record([
            b"81aa\r", b"00355", b"0715\r", b"0412\r", b"0000\r", b"0000\r", b"FFF6\r",
            b"0000\r",
        ]);

        assert_eq!(BcdAscii::classify(&raw), Some(RecordKind::Header));
        assert_eq!(BcdAscii::header(&raw, 0).unwrap().start_altitude, -10);
    }

    #[test]
    fn decodes_data_and_terminal() {
        let data = record([
            b"14BB\r", b"0350\r", b"1000\r", b"2001\r", b"F040\r", b"0000\r", b"0000\r",
            b"0000\r",
        ]);
        let Data(block) = BcdAscii::data(&data, 0).unwrap();
        assert_eq!(block.temperature, 20);
        assert_eq!(block.marker, Some(3));
        assert_eq!(block.cadence, 0x50);
        assert_eq!(&block.words[..3], &[0x1000, 0x2001, 0xF040]);

        let terminal = record([
            b"FBCC\r", b"2F00\r", b"1000\r", b"0000\r", b"0000\r", b"0000\r", b"0000\r",
            b"0000\r",
        ]);
        let Terminal { block, end } = BcdAscii::terminal(&terminal, 0).unwrap();
        assert_eq!(end, 47);
        assert_eq!(block.marker, None);
        assert_eq!(block.temperature, -5);
    }

    #[test]
    fn reports_offset_of_bad_digits() {
        let raw = record([
            b"14BB\r", b"0350\r", b"1000\r", b"20X1\r", b"0000\r", b"0000\r", b"0000\r",
            b"0000\r",
        ]);

        assert_eq!(
            BcdAscii::data(&raw, 800),
            Err(MalformedRecord::InvalidDigits { offset: 815 })
        );
    }

    #[test]
    fn rejects_signs_and_blanks_in_digit_fields() {
        assert_eq!(digits(b"0123", 16, 0), Ok(0x123));
        assert_eq!(digits(b"+123", 16, 5), Err(MalformedRecord::InvalidDigits { offset: 5 }));
        assert_eq!(digits(b"-123", 16, 5), Err(MalformedRecord::InvalidDigits { offset: 5 }));
        assert_eq!(digits(b" 123", 16, 5), Err(MalformedRecord::InvalidDigits { offset: 5 }));
        assert_eq!(digits(b"0A", 10, 5), Err(MalformedRecord::InvalidDigits { offset: 5 }));
        assert_eq!(digits(b"", 16, 5), Err(MalformedRecord::InvalidDigits { offset: 5 }));

        let raw = record([
            b"14BB\r", b"0350\r", b"+100\r", b"0000\r", b"0000\r", b"0000\r", b"0000\r",
            b"0000\r",
        ]);
        assert_eq!(
            BcdAscii::data(&raw, 800),
            Err(MalformedRecord::InvalidDigits { offset: 810 })
        );
    }

    #[test]
    fn decodes_link() {
        let raw = record([
            b"00DD\r", b"002FD", b"0000\r", b"0000\r", b"0000\r", b"0000\r", b"0000\r",
            b"0000\r",
        ]);

        assert_eq!(BcdAscii::classify(&raw), Some(RecordKind::Link));
        assert_eq!(
            BcdAscii::link(&raw, 0).unwrap(),
            Link {
                header: 765,
                totals: None
            }
        );
    }
}
