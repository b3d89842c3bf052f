//! Alarm records for the DS1306 RTC.
//!
//! The DS1306 has two identical alarms, each four registers long: seconds,
//! minutes, hours and day of week. Any of those fields can be set to "match
//! any value", in which case the alarm ignores it when comparing against the
//! clock. Leaving every field as a wildcard fires the alarm once per second.
//!
//! # Alarm Builders
//!
//! - [`DS1306Alarm::every_second`] - every field is a wildcard
//! - [`DS1306Alarm::every_minute`] - fires when the seconds match
//! - [`DS1306Alarm::hourly`] - fires when minutes and seconds match
//! - [`DS1306Alarm::daily`] - fires when hours, minutes and seconds match
//! - [`DS1306Alarm::weekly`] - fires on one day of the week at a given time

use crate::bcd;
use crate::hour::{self, Hour};
use crate::registers::{TimeRepresentation, ALARM0_START, ALARM1_START, ALARM_LEN};

/// A single alarm field: either a value to match or a wildcard.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmField<T> {
    /// Fire regardless of this field's clock value
    Any,
    /// Fire only when the clock value equals this one
    Value(T),
}

impl<T> AlarmField<T> {
    /// Returns `true` for a wildcard.
    pub fn is_any(&self) -> bool {
        matches!(self, AlarmField::Any)
    }

    /// The value to match, or `None` for a wildcard.
    pub fn value(self) -> Option<T> {
        match self {
            AlarmField::Any => None,
            AlarmField::Value(v) => Some(v),
        }
    }
}

impl<T: Default> Default for AlarmField<T> {
    fn default() -> Self {
        AlarmField::Value(T::default())
    }
}

impl<T> From<T> for AlarmField<T> {
    fn from(v: T) -> Self {
        AlarmField::Value(v)
    }
}

impl AlarmField<u8> {
    fn encode(self, mask: u8) -> u8 {
        match self {
            AlarmField::Any => bcd::ANY,
            AlarmField::Value(v) => bcd::encode(v, mask),
        }
    }

    fn decode(byte: u8, mask: u8) -> Self {
        if bcd::is_any(byte) {
            AlarmField::Any
        } else {
            AlarmField::Value(bcd::decode(byte, mask))
        }
    }
}

/// One of the two alarms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
    /// Alarm 0, registers 0x07-0x0A
    Alarm0 = 0,
    /// Alarm 1, registers 0x0B-0x0E
    Alarm1 = 1,
}

impl Alarm {
    /// First register of this alarm.
    pub fn address(self) -> u8 {
        match self {
            Alarm::Alarm0 => ALARM0_START,
            Alarm::Alarm1 => ALARM1_START,
        }
    }
}

/// An alarm index other than 0 or 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidAlarmIndex(pub u8);

impl TryFrom<u8> for Alarm {
    type Error = InvalidAlarmIndex;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Alarm::Alarm0),
            1 => Ok(Alarm::Alarm1),
            _ => Err(InvalidAlarmIndex(v)),
        }
    }
}

impl From<Alarm> for u8 {
    fn from(v: Alarm) -> Self {
        v as u8
    }
}

/// An alarm setting.
///
/// The default value is the cleared record: every field zero, nothing a
/// wildcard.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DS1306Alarm {
    /// Seconds (0-59)
    pub seconds: AlarmField<u8>,
    /// Minutes (0-59)
    pub minutes: AlarmField<u8>,
    /// Hour of day
    pub hours: AlarmField<Hour>,
    /// Day of week (1-7)
    pub day_of_week: AlarmField<u8>,
}

impl DS1306Alarm {
    /// Fires every second.
    pub fn every_second() -> Self {
        DS1306Alarm {
            seconds: AlarmField::Any,
            minutes: AlarmField::Any,
            hours: AlarmField::Any,
            day_of_week: AlarmField::Any,
        }
    }

    /// Fires once a minute, when the seconds match.
    pub fn every_minute(second: u8) -> Self {
        DS1306Alarm {
            seconds: AlarmField::Value(second),
            ..Self::every_second()
        }
    }

    /// Fires once an hour, when minutes and seconds match.
    pub fn hourly(minute: u8, second: u8) -> Self {
        DS1306Alarm {
            minutes: AlarmField::Value(minute),
            ..Self::every_minute(second)
        }
    }

    /// Fires once a day at the given time.
    pub fn daily(hour: Hour, minute: u8, second: u8) -> Self {
        DS1306Alarm {
            hours: AlarmField::Value(hour),
            ..Self::hourly(minute, second)
        }
    }

    /// Fires once a week, on `day_of_week` at the given time.
    pub fn weekly(day_of_week: u8, hour: Hour, minute: u8, second: u8) -> Self {
        DS1306Alarm {
            day_of_week: AlarmField::Value(day_of_week),
            ..Self::daily(hour, minute, second)
        }
    }

    /// Packs the alarm into its four registers, writing the hour in
    /// `representation`.
    pub fn to_registers(&self, representation: TimeRepresentation) -> [u8; ALARM_LEN] {
        [
            self.seconds.encode(bcd::SECONDS_MASK),
            self.minutes.encode(bcd::MINUTES_MASK),
            hour::encode(self.hours, representation),
            self.day_of_week.encode(bcd::DAY_OF_WEEK_MASK),
        ]
    }

    /// Unpacks an alarm from its four registers.
    pub fn from_registers(data: &[u8; ALARM_LEN]) -> Self {
        DS1306Alarm {
            seconds: AlarmField::decode(data[0], bcd::SECONDS_MASK),
            minutes: AlarmField::decode(data[1], bcd::MINUTES_MASK),
            hours: hour::decode(data[2]),
            day_of_week: AlarmField::decode(data[3], bcd::DAY_OF_WEEK_MASK),
        }
    }
}
