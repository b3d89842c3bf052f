//! Hour codec.
//!
//! The DS1306 keeps the hour of the clock and of each alarm in a single byte
//! that takes one of three shapes:
//!
//! - bit 7 set: alarm wildcard, the hour is ignored when matching
//! - bit 6 clear: 24-hour form, BCD hours 0-23 in bits 5-0
//! - bit 6 set: 12-hour form, bit 5 is PM, BCD hours 1-12 in bits 4-0
//!
//! [`Hour`] models the two non-wildcard shapes explicitly. Whichever shape was
//! read, the other representation can be derived from it.

use crate::alarm::AlarmField;
use crate::bcd;
use crate::registers::{Hours, TimeRepresentation};

/// AM/PM designator of a 12-hour time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Meridiem {
    /// Ante meridiem
    Am,
    /// Post meridiem
    Pm,
}

/// An hour of the day in one of the chip's two conventions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hour {
    /// 24-hour form (0-23)
    TwentyFourHour(u8),
    /// 12-hour form (1-12) with meridiem
    TwelveHour(u8, Meridiem),
}

impl Default for Hour {
    fn default() -> Self {
        Hour::TwentyFourHour(0)
    }
}

impl Hour {
    /// The representation this hour is expressed in.
    pub fn representation(&self) -> TimeRepresentation {
        match self {
            Hour::TwentyFourHour(_) => TimeRepresentation::TwentyFourHour,
            Hour::TwelveHour(..) => TimeRepresentation::TwelveHour,
        }
    }

    /// The hour in 24-hour form.
    pub fn hour24(&self) -> u8 {
        match *self {
            Hour::TwentyFourHour(h) => h,
            Hour::TwelveHour(12, Meridiem::Am) => 0,
            Hour::TwelveHour(h, Meridiem::Am) => h,
            Hour::TwelveHour(12, Meridiem::Pm) => 12,
            Hour::TwelveHour(h, Meridiem::Pm) => h.wrapping_add(12),
        }
    }

    /// The hour in 12-hour form.
    pub fn hour12(&self) -> (u8, Meridiem) {
        match *self {
            Hour::TwelveHour(h, meridiem) => (h, meridiem),
            Hour::TwentyFourHour(0) => (12, Meridiem::Am),
            Hour::TwentyFourHour(12) => (12, Meridiem::Pm),
            Hour::TwentyFourHour(h) if h < 12 => (h, Meridiem::Am),
            Hour::TwentyFourHour(h) => (h - 12, Meridiem::Pm),
        }
    }

    /// Re-expresses the hour in `representation`.
    pub fn to_representation(self, representation: TimeRepresentation) -> Hour {
        match representation {
            TimeRepresentation::TwentyFourHour => Hour::TwentyFourHour(self.hour24()),
            TimeRepresentation::TwelveHour => {
                let (h, meridiem) = self.hour12();
                Hour::TwelveHour(h, meridiem)
            }
        }
    }
}

/// Encodes an hour in its own shape.
pub fn encode_hour(hour: Hour) -> u8 {
    match hour {
        Hour::TwentyFourHour(h) => bcd::encode(h, bcd::HOURS_24_MASK),
        Hour::TwelveHour(h, meridiem) => {
            let value = bcd::encode(h, bcd::HOURS_12_MASK);
            if bcd::is_any(value) {
                return value;
            }
            let mut reg = Hours::from(value);
            reg.set_time_representation(TimeRepresentation::TwelveHour);
            reg.set_pm(meridiem == Meridiem::Pm);
            reg.into()
        }
    }
}

/// Encodes an hour field in the write `representation`.
///
/// A wildcard takes priority over the hour value.
pub fn encode(hour: AlarmField<Hour>, representation: TimeRepresentation) -> u8 {
    match hour {
        AlarmField::Any => bcd::ANY,
        AlarmField::Value(h) => encode_hour(h.to_representation(representation)),
    }
}

/// Decodes a non-wildcard hour byte. Bit 7 is ignored.
pub fn decode_hour(byte: u8) -> Hour {
    let reg = Hours::from(byte & !bcd::ANY);
    match reg.time_representation() {
        TimeRepresentation::TwentyFourHour => {
            Hour::TwentyFourHour(bcd::decode(reg.into(), bcd::HOURS_24_MASK))
        }
        TimeRepresentation::TwelveHour => {
            let meridiem = if reg.pm() { Meridiem::Pm } else { Meridiem::Am };
            Hour::TwelveHour(bcd::decode(reg.into(), bcd::HOURS_12_MASK), meridiem)
        }
    }
}

/// Decodes an hour byte, honoring the wildcard.
pub fn decode(byte: u8) -> AlarmField<Hour> {
    if Hours::from(byte).any() {
        AlarmField::Any
    } else {
        AlarmField::Value(decode_hour(byte))
    }
}
