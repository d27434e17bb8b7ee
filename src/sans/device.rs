//! Device identity and the device data block of the header region.

/// Physical encoding of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Raw little-endian binary words ([`crate::sans::codec::BinaryNibble`]).
    Binary,
    /// ASCII hex and decimal digits ([`crate::sans::codec::BcdAscii`]).
    BcdAscii,
}

/// A known device variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hardware {
    /// HAC4 with the 315 kHz transmitter.
    Hac4_315,
    /// HAC4 with the impulse transmitter.
    Hac4Impulse,
    /// HAC5.
    Hac5,
}

impl Hardware {
    /// Recognise a hardware id for an encoding.
    pub fn from_id(encoding: Encoding, id: u16) -> Option<Self> {
        match (encoding, id) {
            (Encoding::BcdAscii, 0xB735) => Some(Self::Hac4_315),
            (Encoding::BcdAscii, 0xB7B4) => Some(Self::Hac4Impulse),
            (Encoding::Binary, 0x03) => Some(Self::Hac5),
            _ => None,
        }
    }

    /// The encoding this hardware writes its dumps in.
    pub fn encoding(self) -> Encoding {
        match self {
            Self::Hac4_315 | Self::Hac4Impulse => Encoding::BcdAscii,
            Self::Hac5 => Encoding::Binary,
        }
    }

    /// A short human-readable device name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hac4_315 => "HAC4 315",
            Self::Hac4Impulse => "HAC4 Impulse",
            Self::Hac5 => "HAC5",
        }
    }
}

/// Date on which the dump was transferred from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// Lifetime totals and personal settings stored by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceTotals {
    /// Wheel perimeter in millimetres.
    pub wheel_perimeter: u16,
    /// Rider weight in kilograms.
    pub weight: u16,
    /// Metres climbed.
    pub altitude_up: u32,
    /// Metres descended.
    pub altitude_down: u32,
    /// Seconds travelled.
    pub travel_time: u32,
}

/// The device data block of a dump's header region.
///
/// Binary dumps store only the next free record; their tours take the year
/// from the caller (see [`crate::avec::DecodeOptions`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceData {
    pub transfer: Option<TransferDate>,
    /// Absolute offset of the record the device will write next.
    pub next_free: usize,
    pub totals: Option<DeviceTotals>,
}
