//! Raw binary encoding, written by HAC5 devices.

use zerocopy::FromBytes;

use crate::sans::{
    check::{ChecksumStatus, word_sum},
    device::{DeviceData, Encoding},
    record::{Block, Data, Header, Link, LinkTotals, MalformedRecord, RecordKind, Terminal},
};

use super::{FieldCodec, Layout};

/// Bytes before the memory image: magic, hardware id, and one reserved byte.
const PREAMBLE: usize = 6;
const MEMORY_SIZE: usize = 0x10000;
const TRAILER: usize = PREAMBLE + MEMORY_SIZE;

/// Offset of the device data block within the memory image.
const DEVICE_DATA: usize = 0x0380;

const RECORD_SIZE: usize = 0x10;

const _: () = assert!((MEMORY_SIZE - 0x0800) % RECORD_SIZE == 0);

/// Binary words with bit-packed nibble fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryNibble;

/// The known part of the device data block. The device stores no transfer
/// date, and the layout of its totals is unknown.
#[repr(C, packed)]
#[derive(FromBytes)]
struct DeviceBlock {
    _reserved: [u8; 2],
    next_free: [u8; 2],
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct HeaderRecord {
    _tag: u8,
    mode: u8,
    link: [u8; 2],
    minute: u8,
    hour: u8,
    day: u8,
    month: u8,
    distance: [u8; 4],
    altitude: [u8; 2],
    pulse: u8,
    _end: u8,
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct BlockRecord {
    _tag: u8,
    temperature: i8,
    cadence: u8,
    marker: u8,
    words: [[u8; 2]; 6],
}

#[repr(C, packed)]
#[derive(FromBytes)]
struct LinkRecord {
    _tag: u8,
    _unknown: u8,
    header: [u8; 2],
    _reserved: [u8; 4],
    distance: [u8; 2],
    altitude_up: [u8; 2],
    altitude_down: [u8; 2],
    _end: [u8; 2],
}

impl BinaryNibble {
    fn block(raw: &[u8; RECORD_SIZE]) -> (Block, u8) {
        let BlockRecord {
            temperature,
            cadence,
            marker,
            words,
            ..
        } = zerocopy::transmute!(*raw);

        let block = Block {
            temperature,
            cadence,
            marker: (marker != 0xFF).then_some(marker),
            words: words.map(u16::from_le_bytes),
        };

        (block, cadence)
    }
}

impl FieldCodec for BinaryNibble {
    const ENCODING: Encoding = Encoding::Binary;
    const LAYOUT: Layout = Layout {
        dump_size: TRAILER + 2,
        // Some transfers end one byte short, cutting the checksum word.
        min_dump_size: TRAILER + 1,
        device_data: PREAMBLE + DEVICE_DATA,
        data_start: PREAMBLE + 0x0800,
        data_end: PREAMBLE + MEMORY_SIZE,
        record_size: RECORD_SIZE,
        pointer_base: PREAMBLE,
    };

    type Raw = [u8; RECORD_SIZE];

    fn hardware_id(dump: &[u8]) -> Option<u16> {
        dump.get(4).map(|&id| id as u16)
    }

    fn device_data(dump: &[u8]) -> Result<DeviceData, MalformedRecord> {
        let offset = Self::LAYOUT.device_data;

        let (block, _) = dump
            .get(offset..)
            .and_then(|r| DeviceBlock::read_from_prefix(r).ok())
            .ok_or(MalformedRecord::Truncated { offset })?;

        let DeviceBlock { next_free, .. } = block;

        Ok(DeviceData {
            transfer: None,
            next_free: u16::from_le_bytes(next_free) as usize + PREAMBLE,
            totals: None,
        })
    }

    fn checksum(dump: &[u8]) -> ChecksumStatus {
        let (Some(image), Some(&[low, high])) =
            (dump.get(PREAMBLE..TRAILER), dump.get(TRAILER..TRAILER + 2))
        else {
            return ChecksumStatus::Unreadable { offset: TRAILER };
        };

        let words = image
            .chunks_exact(2)
            .map(|word| u16::from_le_bytes([word[0], word[1]]));

        ChecksumStatus::compare(u16::from_le_bytes([low, high]), word_sum(0, words))
    }

    fn classify(raw: &Self::Raw) -> Option<RecordKind> {
        match raw[0] {
            0xAA => Some(RecordKind::Header),
            0xBB => Some(RecordKind::Data),
            0xCC => Some(RecordKind::Terminal),
            0xDD => Some(RecordKind::Link),
            _ => None,
        }
    }

    fn header(raw: &Self::Raw, _offset: usize) -> Result<Header, MalformedRecord> {
        let HeaderRecord {
            mode,
            link,
            minute,
            hour,
            day,
            month,
            distance,
            altitude,
            pulse,
            ..
        } = zerocopy::transmute!(*raw);

        let interval = match mode & 0x0F {
            0 => 2,
            1 => 5,
            2 => 10,
            _ => 20,
        };

        Ok(Header {
            profile: mode >> 4,
            interval,
            link: u16::from_le_bytes(link) as usize + PREAMBLE,
            month,
            day,
            hour,
            minute,
            start_distance: u32::from_le_bytes(distance),
            start_altitude: i16::from_le_bytes(altitude),
            start_pulse: pulse as i16,
        })
    }

    fn link(raw: &Self::Raw, _offset: usize) -> Result<Link, MalformedRecord> {
        let LinkRecord {
            header,
            distance,
            altitude_up,
            altitude_down,
            ..
        } = zerocopy::transmute!(*raw);

        Ok(Link {
            header: u16::from_le_bytes(header) as usize + PREAMBLE,
            totals: Some(LinkTotals {
                distance: u16::from_le_bytes(distance),
                altitude_up: u16::from_le_bytes(altitude_up),
                altitude_down: u16::from_le_bytes(altitude_down),
            }),
        })
    }

    fn data(raw: &Self::Raw, _offset: usize) -> Result<Data, MalformedRecord> {
        Ok(Data(Self::block(raw).0))
    }

    fn terminal(raw: &Self::Raw, _offset: usize) -> Result<Terminal, MalformedRecord> {
        // The cadence byte holds the end of recording instead.
        let (block, end) = Self::block(raw);

        Ok(Terminal {
            block: Block { cadence: 0, ..block },
            end,
        })
    }

    fn profile_name(profile: u8) -> &'static str {
        match profile {
            0 => "bike1",
            1 => "bike2",
            2 => "rds",
            3 => "alpine",
            4 => "run",
            _ => "none",
        }
    }
}
