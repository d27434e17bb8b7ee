#![no_std]

//! A decoder for the memory dumps of HAC-family cycling computers.
//!
//! These devices record tours into a fixed-size ring buffer of interlinked
//! records. Each tour is a header record, a run of data records holding
//! bit-packed differential samples, a terminal record, and a link record
//! pointing back at the header. Hacdump walks this chain from the most recent
//! tour backwards and reconstructs each tour's samples in forward time order.
//!
//! Two physical encodings of the same record layout are supported: raw binary
//! words ([`BinaryNibble`](sans::codec::BinaryNibble), HAC5) and ASCII hex
//! digits ([`BcdAscii`](sans::codec::BcdAscii), HAC4).
//!
//! Most users should begin with the functions in the [`avec`] module. If these
//! prove insufficient, the building blocks in [`sans`] can be driven directly.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable reader and file based decoding (default).

extern crate alloc;

pub mod avec;
pub mod sans;
