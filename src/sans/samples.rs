//! Reconstruction of absolute samples from differential sample words.

use core::{marker::PhantomData, slice};

use tinyvec::ArrayVec;

use super::{
    codec::FieldCodec,
    record::{BLOCK_SAMPLES, Block, Data, Header, Slice, Terminal},
};

/// One point of a tour's time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Seconds since the previous sample.
    pub time: u16,
    /// Beats per minute.
    pub pulse: i16,
    /// Metres.
    pub altitude: i32,
    /// Metres travelled since the previous sample.
    pub distance: i32,
    /// Revolutions per minute.
    pub cadence: u8,
    /// Degrees Celsius.
    pub temperature: i8,
    pub marker: Option<u8>,
}

/// A lazy iterator over the samples of one tour, in forward time order.
///
/// The first sample lies at zero elapsed time and carries the header's start
/// values. Every following sample adds the deltas of one packed word to the
/// running pulse and altitude. A tour without recorded slices yields nothing.
///
/// The iterator is cheap to clone, so a sequence can be restarted by cloning
/// it before use.
#[derive(Debug, Clone)]
pub struct Samples<'a, C> {
    interval: u16,
    pulse: i16,
    altitude: i32,
    first: Option<Sample>,
    blocks: slice::Iter<'a, Data>,
    terminal: Option<&'a Terminal>,
    block: Block,
    slices: ArrayVec<[Slice; BLOCK_SAMPLES]>,
    index: usize,
    _codec: PhantomData<C>,
}

impl<'a, C: FieldCodec> Samples<'a, C> {
    /// Reconstruct the samples of the blocks following `header`.
    pub fn new(header: &Header, blocks: &'a [Data], terminal: &'a Terminal) -> Self {
        let interval = header.interval;
        let recorded = !blocks.is_empty() || terminal.sample_count(interval) > 0;

        // Sensors without a delta encoding report the first block's value.
        let leading = blocks.first().map_or(&terminal.block, |Data(block)| block);

        let first = recorded.then_some(Sample {
            time: 0,
            pulse: header.start_pulse,
            altitude: header.start_altitude as i32,
            distance: 0,
            cadence: leading.cadence,
            temperature: leading.temperature,
            marker: None,
        });

        Self {
            interval,
            pulse: header.start_pulse,
            altitude: header.start_altitude as i32,
            first,
            blocks: blocks.iter(),
            terminal: Some(terminal),
            block: Block::default(),
            slices: ArrayVec::new(),
            index: 0,
            _codec: PhantomData,
        }
    }

    /// Load the slices of the next block, returning `false` past the terminal.
    fn load(&mut self) -> bool {
        if let Some(data) = self.blocks.next() {
            self.block = data.0;
            self.slices = data.slices(self.interval);
        } else if let Some(terminal) = self.terminal.take() {
            self.block = terminal.block;
            self.slices = terminal.slices(self.interval);
        } else {
            return false;
        }

        self.index = 0;
        true
    }
}

impl<C: FieldCodec> Iterator for Samples<'_, C> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if let Some(first) = self.first.take() {
            return Some(first);
        }

        while self.index >= self.slices.len() {
            if !self.load() {
                return None;
            }
        }

        let Slice { time, marker, word } = self.slices[self.index];
        self.index += 1;

        self.pulse = self.pulse.wrapping_add(C::delta_pulse(word));
        self.altitude += C::delta_altitude(word) as i32;

        Some(Sample {
            time,
            pulse: self.pulse,
            altitude: self.altitude,
            distance: C::delta_distance(word),
            cadence: self.block.cadence,
            temperature: self.block.temperature,
            marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::sans::codec::{BinaryNibble, altitude_delta};

    fn header() -> Header {
        Header {
            profile: 0,
            interval: 20,
            link: 0,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            start_distance: 0,
            start_altitude: 300,
            start_pulse: 120,
        }
    }

    fn word(pulse: i16, altitude: i16, distance: u16) -> u16 {
        ((pulse / 2) as u16 & 0xF) << 12 | (altitude as u16 & 0x3F) << 6 | (distance & 0x3F)
    }

    fn block(words: [u16; 6]) -> Block {
        Block {
            temperature: 18,
            cadence: 85,
            marker: None,
            words,
        }
    }

    fn collect(header: &Header, blocks: &[Data], terminal: &Terminal) -> Vec<Sample> {
        Samples::<BinaryNibble>::new(header, blocks, terminal).collect()
    }

    #[test]
    fn terminal_ending_on_a_slice_boundary() {
        let terminal = Terminal {
            block: block([word(2, 0, 0); 6]),
            end: 20,
        };

        let samples: Vec<_> = collect(&header(), &[], &terminal)
            .iter()
            .map(|s| (s.time, s.pulse))
            .collect();

        assert_eq!(samples, [(0, 120), (20, 122), (0, 124)]);
    }

    #[test]
    fn running_totals_follow_the_deltas() {
        let deltas = [(2, 3, 1), (-4, 17, 0), (6, -17, 5), (0, -1, 63), (2, 31, 2), (-2, 0, 0)];
        let words = deltas.map(|(p, a, d)| word(p, a, d));

        let data = [Data(block(words)), Data(block(words))];
        let terminal = Terminal {
            block: block(words),
            end: 47,
        };

        let samples = collect(&header(), &data, &terminal);
        assert_eq!(samples.len(), 1 + 6 + 6 + 3);

        let mut pulse = 120;
        let mut altitude = 300;
        for (sample, (p, a, d)) in samples[1..].iter().zip(deltas.iter().cycle()) {
            pulse += p;
            altitude += altitude_delta(word(0, *a, 0)) as i32;

            assert_eq!(sample.pulse, pulse);
            assert_eq!(sample.altitude, altitude);
            assert_eq!(sample.distance, *d as i32 * 10);
        }
    }

    #[test]
    fn last_sample_carries_the_remainder() {
        let data = [Data(block([0; 6]))];
        let terminal = Terminal {
            block: block([0; 6]),
            end: 47,
        };

        let times: Vec<u16> = collect(&header(), &data, &terminal)
            .iter()
            .map(|s| s.time)
            .collect();

        assert_eq!(times, [0, 20, 20, 20, 20, 20, 20, 20, 20, 7]);
    }

    #[test]
    fn markers_reach_the_first_sample_of_their_block() {
        let data = [Data(Block {
            marker: Some(4),
            ..block([0; 6])
        })];
        let terminal = Terminal {
            block: block([0; 6]),
            end: 0,
        };

        let samples = collect(&header(), &data, &terminal);

        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0].marker, None);
        assert_eq!(samples[1].marker, Some(4));
        assert!(samples[2..].iter().all(|s| s.marker.is_none()));
    }

    #[test]
    fn start_sample_reports_the_first_block() {
        let data = [Data(Block {
            temperature: -3,
            cadence: 90,
            ..block([0; 6])
        })];
        let terminal = Terminal {
            block: block([0; 6]),
            end: 0,
        };

        let first = collect(&header(), &data, &terminal)[0];

        assert_eq!(first.temperature, -3);
        assert_eq!(first.cadence, 90);
        assert_eq!(first.altitude, 300);
    }

    #[test]
    fn empty_tour_has_no_samples() {
        let terminal = Terminal {
            block: block([word(2, 0, 0); 6]),
            end: 0,
        };

        assert!(collect(&header(), &[], &terminal).is_empty());
    }

    #[test]
    fn clones_restart_independently() {
        let terminal = Terminal {
            block: block([word(2, 1, 1); 6]),
            end: 120,
        };
        let header = header();

        let mut samples = Samples::<BinaryNibble>::new(&header, &[], &terminal);
        let restart = samples.clone();
        samples.next();
        samples.next();

        assert_eq!(restart.count(), 7);
        assert_eq!(samples.count(), 5);
    }
}
