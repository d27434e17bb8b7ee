//! Seekable reads over a dump's circular data region.

use core::ops::Range;

use thiserror::Error;

/// An error reading from the data region.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    /// Read larger than the whole region.
    #[error("Read of {size} bytes exceeds the {region} byte data region.")]
    OutOfBounds { size: usize, region: usize },
}

/// A read position within the circular data region of a borrowed dump.
///
/// Positions are absolute dump offsets. Every seek and read wraps into the
/// region, so the cursor can never observe bytes outside of it.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    dump: &'a [u8],
    start: usize,
    end: usize,
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor over `region` of `dump`, positioned at the region start.
    ///
    /// The region must be non-empty and lie within the dump.
    pub fn new(dump: &'a [u8], region: Range<usize>) -> Self {
        debug_assert!(region.start < region.end && region.end <= dump.len());

        Self {
            dump,
            start: region.start,
            end: region.end,
            position: region.start,
        }
    }

    /// The wrapped data region.
    pub fn region(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Map an offset into the region, treating the region as a ring.
    pub fn wrap(&self, offset: usize) -> usize {
        let len = self.end - self.start;

        if offset >= self.start {
            self.start + (offset - self.start) % len
        } else {
            self.end - 1 - (self.start - offset - 1) % len
        }
    }

    /// Set the read position, wrapping into the region.
    pub fn seek(&mut self, offset: usize) {
        self.position = self.wrap(offset);
    }

    /// Fill `buf` from the current position, advancing past it.
    ///
    /// A read crossing the region end resumes at the region start.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<(), CursorError> {
        let region = self.end - self.start;
        if buf.len() > region {
            Err(CursorError::OutOfBounds {
                size: buf.len(),
                region,
            })?;
        }

        let tail = (self.end - self.position).min(buf.len());
        let (head, rest) = buf.split_at_mut(tail);

        head.copy_from_slice(&self.dump[self.position..self.position + tail]);
        rest.copy_from_slice(&self.dump[self.start..self.start + rest.len()]);

        self.position = self.wrap(self.position + buf.len());

        Ok(())
    }

    /// Take an exact number of bytes from the current position.
    pub fn take<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let mut buf = [0; N];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, CursorError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, CursorError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CursorError> {
        Ok(u32::from_le_bytes(self.take()?))
    }
}
