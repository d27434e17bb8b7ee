#![allow(dead_code)]

//! Builder for synthetic dumps in both encodings.

use hacdump::sans::{
    codec::{BcdAscii, BinaryNibble, FieldCodec, Layout},
    device::Encoding,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn setup_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "hacdump=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub fn layout(encoding: Encoding) -> Layout {
    match encoding {
        Encoding::Binary => BinaryNibble::LAYOUT,
        Encoding::BcdAscii => BcdAscii::LAYOUT,
    }
}

/// Pack a sample word from decoded deltas. Altitude is taken as stored.
pub fn word(pulse: i16, altitude: i16, distance: u16) -> u16 {
    ((pulse / 2) as u16 & 0xF) << 12 | (altitude as u16 & 0x3F) << 6 | (distance / 10 & 0x3F)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub temperature: i8,
    pub cadence: u8,
    pub marker: Option<u8>,
    pub words: [u16; 6],
}

impl BlockSpec {
    pub fn new(words: [u16; 6]) -> Self {
        Self {
            temperature: 21,
            cadence: 80,
            marker: None,
            words,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourSpec {
    pub profile: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub start_distance: u16,
    pub start_altitude: i16,
    pub start_pulse: u8,
    pub blocks: Vec<BlockSpec>,
    pub terminal: BlockSpec,
    /// Seconds into the terminal block at which recording stopped.
    pub end: u8,
}

impl TourSpec {
    pub fn new(month: u8, day: u8) -> Self {
        Self {
            profile: 0,
            month,
            day,
            hour: 9,
            minute: 30,
            start_distance: 1000,
            start_altitude: 300,
            start_pulse: 120,
            blocks: vec![],
            terminal: BlockSpec::new([0; 6]),
            end: 20,
        }
    }

    pub fn records(&self) -> usize {
        self.blocks.len() + 3
    }
}

/// A tour placed in the data region.
#[derive(Debug, Clone)]
pub struct Placed {
    pub spec: TourSpec,
    pub header: usize,
    pub link: usize,
    /// Link pointer stored in the header.
    pub header_link: usize,
    /// Header pointer stored in the link.
    pub link_header: usize,
}

#[derive(Debug, Clone)]
pub struct DumpBuilder {
    pub encoding: Encoding,
    pub layout: Layout,
    pub hardware_id: u16,
    /// Transfer date, stored by digit dumps only.
    pub transfer: (i32, u8, u8),
    pub tours: Vec<Placed>,
    /// Index of the record the next tour starts at.
    pub next: usize,
    pub next_free: Option<usize>,
    pub corrupt_checksum: bool,
}

impl DumpBuilder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            layout: layout(encoding),
            hardware_id: match encoding {
                Encoding::Binary => 0x03,
                Encoding::BcdAscii => 0xB735,
            },
            transfer: (2024, 4, 20),
            tours: vec![],
            next: 0,
            next_free: None,
            corrupt_checksum: false,
        }
    }

    /// Place the next tour at the given record index.
    pub fn start_at(mut self, index: usize) -> Self {
        self.next = index;
        self
    }

    /// Absolute offset of the record at an index, wrapping around the region.
    pub fn slot(&self, index: usize) -> usize {
        self.layout.data_start + (index % self.layout.capacity()) * self.layout.record_size
    }

    /// Append a tour after the previous one, oldest first.
    pub fn tour(mut self, spec: TourSpec) -> Self {
        let header = self.slot(self.next);
        let link = self.slot(self.next + spec.records() - 1);

        self.next += spec.records();
        self.tours.push(Placed {
            spec,
            header,
            link,
            header_link: link,
            link_header: header,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        match self.encoding {
            Encoding::Binary => self.build_binary(),
            Encoding::BcdAscii => self.build_bcd(),
        }
    }

    fn next_free(&self) -> usize {
        self.next_free.unwrap_or_else(|| self.slot(self.next))
    }

    fn build_binary(&self) -> Vec<u8> {
        const BASE: usize = 6;

        let mut dump = vec![0; self.layout.dump_size];
        dump[..4].copy_from_slice(b"AFRO");
        dump[4] = self.hardware_id as u8;

        let next_free = ((self.next_free() - BASE) as u16).to_le_bytes();
        dump[self.layout.device_data + 2..][..2].copy_from_slice(&next_free);

        for placed in &self.tours {
            let spec = &placed.spec;
            let mut index = (placed.header - self.layout.data_start) / self.layout.record_size;

            let mut header = vec![0xAA, spec.profile << 4 | 3];
            header.extend(((placed.header_link - BASE) as u16).to_le_bytes());
            header.extend([spec.minute, spec.hour, spec.day, spec.month]);
            header.extend((spec.start_distance as u32).to_le_bytes());
            header.extend(spec.start_altitude.to_le_bytes());
            header.extend([spec.start_pulse, 0xFF]);
            self.put(&mut dump, index, &header);

            let block = |tag: u8, b: &BlockSpec, third: u8| {
                let mut raw = vec![tag, b.temperature as u8, third, b.marker.unwrap_or(0xFF)];
                for w in b.words {
                    raw.extend(w.to_le_bytes());
                }
                raw
            };

            for b in &spec.blocks {
                index += 1;
                self.put(&mut dump, index, &block(0xBB, b, b.cadence));
            }
            index += 1;
            let terminal = BlockSpec {
                marker: None,
                ..spec.terminal
            };
            self.put(&mut dump, index, &block(0xCC, &terminal, spec.end));

            index += 1;
            let mut link = vec![0xDD, 0];
            link.extend(((placed.link_header - BASE) as u16).to_le_bytes());
            link.extend([0; 4]);
            link.extend(((spec.blocks.len() as u16 + 1) * 60).to_le_bytes());
            link.extend(15u16.to_le_bytes());
            link.extend(10u16.to_le_bytes());
            link.extend([0, 0]);
            self.put(&mut dump, index, &link);
        }

        let trailer = self.layout.data_end;
        let sum = dump[BASE..trailer]
            .chunks_exact(2)
            .fold(0u16, |acc, w| acc.wrapping_add(u16::from_le_bytes([w[0], w[1]])));
        let sum = if self.corrupt_checksum { sum ^ 1 } else { sum };
        dump[trailer..].copy_from_slice(&sum.to_le_bytes());

        dump
    }

    fn build_bcd(&self) -> Vec<u8> {
        let mut dump = b"0000\n".repeat(self.layout.dump_size / 5);
        dump[..5].copy_from_slice(b"AFRO\n");

        let (year, month, day) = self.transfer;
        let device = [
            format!("{:04X}\n", self.hardware_id),
            format!("{year:04}\n"),
            format!("{month:02}{day:02}\n"),
            format!("{:05X}", self.next_free()),
            format!("{:04X}\n", 2100),
            format!("{:04X}\n", 75),
            format!("{:04X}\n", 12_000),
            format!("{:04X}\n", 11_500),
            "0100\n".to_string(),
            "0000\n".to_string(),
        ]
        .concat();
        dump[self.layout.device_data..][..device.len()].copy_from_slice(device.as_bytes());

        for placed in &self.tours {
            let spec = &placed.spec;
            let mut index = (placed.header - self.layout.data_start) / self.layout.record_size;

            let header = [
                format!("{:02X}AA\n", spec.profile),
                format!("{:05X}", placed.header_link),
                format!("{:02}{:02}\n", spec.hour, spec.minute),
                format!("{:02}{:02}\n", spec.month, spec.day),
                format!("{:04X}\n", spec.start_distance),
                "0000\n".to_string(),
                format!("{:04X}\n", spec.start_altitude as u16),
                format!("{:04X}\n", spec.start_pulse),
            ]
            .concat();
            self.put(&mut dump, index, header.as_bytes());

            let block = |tag: &str, b: &BlockSpec, marker: u8| {
                let mut raw = format!(
                    "{:02X}{tag}\n{marker:02X}{:02X}\n",
                    b.temperature as u8, b.cadence
                );
                for w in b.words {
                    raw.push_str(&format!("{w:04X}\n"));
                }
                raw
            };

            for b in &spec.blocks {
                index += 1;
                let raw = block("BB", b, b.marker.unwrap_or(0));
                self.put(&mut dump, index, raw.as_bytes());
            }
            index += 1;
            let raw = block("CC", &spec.terminal, spec.end);
            self.put(&mut dump, index, raw.as_bytes());

            index += 1;
            let link = format!("00DD\n{:05X}", placed.link_header) + &"0000\n".repeat(6);
            self.put(&mut dump, index, link.as_bytes());
        }

        let trailer = self.layout.data_end;
        let sum = dump[5..trailer].chunks_exact(5).fold(0u16, |acc, chunk| {
            let digits = std::str::from_utf8(&chunk[..4]).unwrap();
            acc.wrapping_add(u16::from_str_radix(digits, 16).unwrap())
        });
        let sum = if self.corrupt_checksum { sum ^ 1 } else { sum };
        dump[trailer..].copy_from_slice(format!("{sum:04X}\n").as_bytes());

        dump
    }

    fn put(&self, dump: &mut [u8], index: usize, record: &[u8]) {
        assert_eq!(record.len(), self.layout.record_size);
        let offset = self.slot(index);
        dump[offset..offset + record.len()].copy_from_slice(record);
    }
}
