//! IO-free building blocks for decoding dumps.
//!
//! This module is intended for applications that need finer control than the
//! functions in [`crate::avec`] offer, such as inspecting individual records or
//! stopping a walk early.
//!
//! # Architecture
//!
//! A dump is a header region followed by a circular data region of fixed-size
//! records. Decoding proceeds in layers:
//!
//! - [`check`] recognises the format and hardware, and computes the word-sum
//! checksum.
//!
//! - [`cursor`] reads bytes from the data region, wrapping at its end.
//!
//! - [`codec`] maps one physical encoding onto the shared logical record
//! layout, and decodes the differential sample words.
//!
//! - [`record`] classifies records and exposes their fields.
//!
//! - [`chain`] walks the header/link chain from the most recent tour to the
//! oldest, yielding one raw tour per step.
//!
//! - [`samples`] turns a raw tour's blocks into absolute samples.
//!
//! The walk runs backwards in time while each tour's samples run forwards;
//! keeping [`chain`] and [`samples`] apart means neither ordering leaks into
//! the other.

pub mod chain;
pub mod check;
pub mod codec;
pub mod cursor;
pub mod device;
pub mod record;
pub mod samples;
