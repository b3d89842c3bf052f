//! Clock/calendar record for the DS1306 RTC.
//!
//! The DS1306 stores date and time in 7 consecutive registers:
//! - Seconds, Minutes, Hours, Day of week, Date, Month, Year
//!
//! Fields are carried verbatim. The chip does no validation and neither does
//! this module: writing an impossible value (minute 75, month 13) leaves the
//! on-wire bytes unspecified. Day of week is whatever numbering the caller
//! chose; [`day_of_week`] holds the conventional one.
//!
//! # chrono
//!
//! [`DS1306DateTime::from_datetime`] and [`DS1306DateTime::to_datetime`]
//! convert to and from chrono's `NaiveDateTime` for years 2000-2099, using
//! Sunday = 1 for the day of week.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::bcd;
use crate::hour::{self, Hour};
use crate::registers::{TimeRepresentation, DATETIME_LEN};

/// Suggested day-of-week numbering.
pub mod day_of_week {
    /// Sunday
    pub const SUNDAY: u8 = 1;
    /// Monday
    pub const MONDAY: u8 = 2;
    /// Tuesday
    pub const TUESDAY: u8 = 3;
    /// Wednesday
    pub const WEDNESDAY: u8 = 4;
    /// Thursday
    pub const THURSDAY: u8 = 5;
    /// Friday
    pub const FRIDAY: u8 = 6;
    /// Saturday
    pub const SATURDAY: u8 = 7;
}

/// Current date and time as held by the clock registers.
///
/// Bit 7 is a wildcard only in the alarm registers.
/// The BCD fields here pass such a byte through unchanged, but
/// [`hours`](Self::hours) always decodes to a concrete [`Hour`] with bit 7
/// ignored, so an hour byte of `0x95` reads as 15.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DS1306DateTime {
    /// Seconds (0-59)
    pub seconds: u8,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Hour of day, never a wildcard
    pub hours: Hour,
    /// Day of week (1-7)
    pub day_of_week: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Two-digit year (0-99)
    pub year: u8,
}

/// Errors converting between [`DS1306DateTime`] and chrono.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DateTimeError {
    /// The date or time does not exist (e.g., February 30th)
    InvalidDateTime,
    /// The year is outside 2000-2099
    YearOutOfRange,
}

impl DS1306DateTime {
    /// Packs the record into the seven clock registers, writing the hour in
    /// `representation`.
    pub fn to_registers(&self, representation: TimeRepresentation) -> [u8; DATETIME_LEN] {
        [
            bcd::encode(self.seconds, bcd::SECONDS_MASK),
            bcd::encode(self.minutes, bcd::MINUTES_MASK),
            hour::encode_hour(self.hours.to_representation(representation)),
            bcd::encode(self.day_of_week, bcd::DAY_OF_WEEK_MASK),
            bcd::encode(self.day, bcd::DAY_MASK),
            bcd::encode(self.month, bcd::MONTH_MASK),
            bcd::encode8(self.year),
        ]
    }

    /// Unpacks a record from the seven clock registers.
    pub fn from_registers(data: &[u8; DATETIME_LEN]) -> Self {
        DS1306DateTime {
            seconds: bcd::decode(data[0], bcd::SECONDS_MASK),
            minutes: bcd::decode(data[1], bcd::MINUTES_MASK),
            hours: hour::decode_hour(data[2]),
            day_of_week: bcd::decode(data[3], bcd::DAY_OF_WEEK_MASK),
            day: bcd::decode(data[4], bcd::DAY_MASK),
            month: bcd::decode(data[5], bcd::MONTH_MASK),
            year: bcd::decode8(data[6]),
        }
    }

    /// Builds a record from a chrono date and time, expressing the hour in
    /// `representation`.
    pub fn from_datetime(
        datetime: &NaiveDateTime,
        representation: TimeRepresentation,
    ) -> Result<Self, DateTimeError> {
        let year = datetime.year();
        if !(2000..=2099).contains(&year) {
            warn!("year {} cannot be stored in the clock", year);
            return Err(DateTimeError::YearOutOfRange);
        }
        let narrow = |v: u32| u8::try_from(v).map_err(|_| DateTimeError::InvalidDateTime);
        let raw = DS1306DateTime {
            seconds: narrow(datetime.second())?,
            minutes: narrow(datetime.minute())?,
            hours: Hour::TwentyFourHour(narrow(datetime.hour())?).to_representation(representation),
            day_of_week: narrow(datetime.weekday().number_from_sunday())?,
            day: narrow(datetime.day())?,
            month: narrow(datetime.month())?,
            year: u8::try_from(year - 2000).map_err(|_| DateTimeError::YearOutOfRange)?,
        };
        debug!(
            "{}-{}-{} {}:{}:{}",
            raw.year,
            raw.month,
            raw.day,
            raw.hours.hour24(),
            raw.minutes,
            raw.seconds
        );
        Ok(raw)
    }

    /// Converts the record to a chrono date and time in the 2000s.
    ///
    /// The day of week is not checked against the date.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, DateTimeError> {
        NaiveDate::from_ymd_opt(
            2000 + i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(self.hours.hour24()),
                u32::from(self.minutes),
                u32::from(self.seconds),
            )
        })
        .ok_or(DateTimeError::InvalidDateTime)
    }
}
