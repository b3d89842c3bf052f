//! Register definitions and bitfield structures for the DS1306 RTC.
//!
//! This module contains the register map, the region boundaries and the
//! bitfield definitions for the control, status, trickle-charge and hour
//! registers.

use bitfield::bitfield;

use crate::alarm::Alarm;

/// Register addresses for the DS1306 RTC.
///
/// Reads use the address as-is; writes set [`WRITE_OFFSET`].
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 0x02,
    /// Day of week register (1-7)
    Day = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12)
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Alarm 0 seconds register
    Alarm0Seconds = 0x07,
    /// Alarm 0 minutes register
    Alarm0Minutes = 0x08,
    /// Alarm 0 hours register
    Alarm0Hours = 0x09,
    /// Alarm 0 day of week register
    Alarm0Day = 0x0A,
    /// Alarm 1 seconds register
    Alarm1Seconds = 0x0B,
    /// Alarm 1 minutes register
    Alarm1Minutes = 0x0C,
    /// Alarm 1 hours register
    Alarm1Hours = 0x0D,
    /// Alarm 1 day of week register
    Alarm1Day = 0x0E,
    /// Control register
    Control = 0x0F,
    /// Status register
    Status = 0x10,
    /// Trickle-charge control register
    TrickleCharge = 0x11,
}

impl From<RegAddr> for u8 {
    fn from(v: RegAddr) -> Self {
        v as u8
    }
}

/// Bit OR'd into the address byte to select a register write.
pub const WRITE_OFFSET: u8 = 0x80;

/// Start of the clock/calendar region.
pub const DATETIME_START: u8 = RegAddr::Seconds as u8;
/// Size of the clock/calendar region.
pub const DATETIME_LEN: usize = 7;
/// Start of the alarm 0 region.
pub const ALARM0_START: u8 = RegAddr::Alarm0Seconds as u8;
/// Start of the alarm 1 region.
pub const ALARM1_START: u8 = RegAddr::Alarm1Seconds as u8;
/// Size of each alarm region.
pub const ALARM_LEN: usize = 4;
/// First byte of battery-backed user memory.
pub const USER_START: u8 = 0x20;
/// Last byte of battery-backed user memory.
pub const USER_END: u8 = 0x7F;
/// Size of user memory.
pub const USER_LEN: usize = (USER_END - USER_START) as usize + 1;

/// Returns `true` if `len` bytes starting at `address` fall inside user memory.
///
/// The last byte of the region cannot start an access.
pub fn user_range_contains(address: u8, len: usize) -> bool {
    address >= USER_START
        && address < USER_END
        && usize::from(address) + len <= usize::from(USER_END) + 1
}

/// Time representation used for the hour byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    #[default]
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    /// Converts a `TimeRepresentation` to its raw register value.
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Hours register shape shared by the clock and both alarms.
    ///
    /// The hour value itself is BCD in bits 5-0 (24-hour) or 4-0 (12-hour)
    /// and is handled by the hour codec.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Alarm wildcard flag
    pub any, set_any: 7;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag (12-hour form only)
    pub pm, set_pm: 5;
}
from_register_u8!(Hours);

bitfield! {
    /// Control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// Write protect; register writes other than to this register are ignored while set
    pub write_protect, set_write_protect: 6;
    /// Enable the 1 Hz output pin
    pub one_hz_output, set_one_hz_output: 2;
    /// Enable alarm 1 interrupt
    pub alarm1_interrupt_enable, set_alarm1_interrupt_enable: 1;
    /// Enable alarm 0 interrupt
    pub alarm0_interrupt_enable, set_alarm0_interrupt_enable: 0;
}
from_register_u8!(Control);

impl Control {
    /// Interrupt enable bit for `alarm`.
    pub fn alarm_interrupt_enable(&self, alarm: Alarm) -> bool {
        match alarm {
            Alarm::Alarm0 => self.alarm0_interrupt_enable(),
            Alarm::Alarm1 => self.alarm1_interrupt_enable(),
        }
    }

    /// Sets the interrupt enable bit for `alarm`.
    pub fn set_alarm_interrupt_enable(&mut self, alarm: Alarm, enabled: bool) {
        match alarm {
            Alarm::Alarm0 => self.set_alarm0_interrupt_enable(enabled),
            Alarm::Alarm1 => self.set_alarm1_interrupt_enable(enabled),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Control(");
        if self.write_protect() {
            defmt::write!(f, "WP, ");
        }
        if self.one_hz_output() {
            defmt::write!(f, "1Hz, ");
        }
        defmt::write!(
            f,
            "AIE1={}, AIE0={})",
            self.alarm1_interrupt_enable(),
            self.alarm0_interrupt_enable()
        );
    }
}

bitfield! {
    /// Status register. Flags are cleared by writing 0.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Status(u8);
    impl Debug;
    /// Alarm 1 triggered flag
    pub alarm1_flag, set_alarm1_flag: 1;
    /// Alarm 0 triggered flag
    pub alarm0_flag, set_alarm0_flag: 0;
}
from_register_u8!(Status);

impl Status {
    /// Triggered flag for `alarm`.
    pub fn alarm_flag(&self, alarm: Alarm) -> bool {
        match alarm {
            Alarm::Alarm0 => self.alarm0_flag(),
            Alarm::Alarm1 => self.alarm1_flag(),
        }
    }

    /// Sets the triggered flag for `alarm`.
    pub fn set_alarm_flag(&mut self, alarm: Alarm, triggered: bool) {
        match alarm {
            Alarm::Alarm0 => self.set_alarm0_flag(triggered),
            Alarm::Alarm1 => self.set_alarm1_flag(triggered),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status(IRQF1={}, IRQF0={})", self.alarm1_flag(), self.alarm0_flag());
    }
}

/// Pattern in bits 7-4 of the trickle-charge register that enables charging.
pub const TRICKLE_CHARGE_ENABLE: u8 = 0b1010;

bitfield! {
    /// Trickle-charge control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct TrickleChargeControl(u8);
    impl Debug;
    /// Trickle charger select, `0b1010` when enabled
    pub select, set_select: 7, 4;
    /// Number of diodes in the charge path
    pub diode_select, set_diode_select: 3, 2;
    /// Resistor code
    pub resistor_select, set_resistor_select: 1, 0;
}
from_register_u8!(TrickleChargeControl);

impl TrickleChargeControl {
    /// Decodes the register into a charger setting, or `None` if charging is
    /// disabled or the diode/resistor fields do not select a charge path.
    pub fn trickle_charge(&self) -> Option<TrickleCharge> {
        if self.select() != TRICKLE_CHARGE_ENABLE {
            return None;
        }
        Some(TrickleCharge {
            diodes: Diodes::from_bits(self.diode_select())?,
            resistor: Resistor::from_bits(self.resistor_select())?,
        })
    }
}

impl From<TrickleCharge> for TrickleChargeControl {
    fn from(v: TrickleCharge) -> Self {
        let mut reg = TrickleChargeControl::default();
        reg.set_select(TRICKLE_CHARGE_ENABLE);
        reg.set_diode_select(v.diodes as u8);
        reg.set_resistor_select(v.resistor as u8);
        reg
    }
}

/// Number of diodes between VCC2 and VCC1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Diodes {
    /// One diode (0.7 V drop)
    One = 0b01,
    /// Two diodes (1.4 V drop)
    Two = 0b10,
}

impl Diodes {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b01 => Some(Diodes::One),
            0b10 => Some(Diodes::Two),
            _ => None,
        }
    }

    /// Creates a diode selection from a diode count (1 or 2).
    pub fn from_count(count: u8) -> Option<Self> {
        Self::from_bits(count)
    }

    /// Number of diodes.
    pub fn count(self) -> u8 {
        self as u8
    }
}

/// Trickle-charge current-limiting resistor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resistor {
    /// 2 kΩ
    K2 = 0b01,
    /// 4 kΩ
    K4 = 0b10,
    /// 8 kΩ
    K8 = 0b11,
}

impl Resistor {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b01 => Some(Resistor::K2),
            0b10 => Some(Resistor::K4),
            0b11 => Some(Resistor::K8),
            _ => None,
        }
    }

    /// Creates a resistor selection from its value in kΩ (2, 4 or 8).
    pub fn from_kohm(kohm: u8) -> Option<Self> {
        match kohm {
            2 => Some(Resistor::K2),
            4 => Some(Resistor::K4),
            8 => Some(Resistor::K8),
            _ => None,
        }
    }

    /// Resistance in kΩ.
    pub fn kohm(self) -> u8 {
        match self {
            Resistor::K2 => 2,
            Resistor::K4 => 4,
            Resistor::K8 => 8,
        }
    }
}

/// An enabled trickle-charge configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrickleCharge {
    /// Diodes in the charge path
    pub diodes: Diodes,
    /// Current-limiting resistor
    pub resistor: Resistor,
}

impl TrickleCharge {
    /// Builds a configuration from a diode count (1 or 2) and a resistance in
    /// kΩ (2, 4 or 8). Returns `None` for any other combination.
    pub fn new(diodes: u8, resistance_kohm: u8) -> Option<Self> {
        Some(TrickleCharge {
            diodes: Diodes::from_count(diodes)?,
            resistor: Resistor::from_kohm(resistance_kohm)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_map_layout() {
        assert_eq!(DATETIME_START, 0x00);
        assert_eq!(ALARM0_START, 0x07);
        assert_eq!(ALARM1_START, 0x0B);
        assert_eq!(u8::from(RegAddr::Control), 0x0F);
        assert_eq!(u8::from(RegAddr::Status), 0x10);
        assert_eq!(u8::from(RegAddr::TrickleCharge), 0x11);
        assert_eq!(USER_LEN, 96);
        assert_eq!(usize::from(ALARM0_START) + ALARM_LEN, usize::from(ALARM1_START));
        assert_eq!(
            usize::from(ALARM1_START) + ALARM_LEN,
            usize::from(u8::from(RegAddr::Control))
        );
    }

    #[test]
    fn test_user_range_contains() {
        assert!(user_range_contains(0x20, 1));
        assert!(user_range_contains(0x20, 96));
        assert!(user_range_contains(0x7E, 2));
        assert!(user_range_contains(0x40, 0));

        assert!(!user_range_contains(0x1F, 1));
        assert!(!user_range_contains(0x20, 97));
        assert!(!user_range_contains(0x7E, 3));
        // The last byte cannot start an access
        assert!(!user_range_contains(0x7F, 1));
        assert!(!user_range_contains(0x80, 1));
    }

    #[test]
    fn test_hours_register_conversions() {
        // 24-hour, 23 hours
        let hours = Hours::from(0x23);
        assert!(!hours.any());
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(u8::from(hours), 0x23);

        // 12 PM in 12-hour mode
        let hours = Hours::from(0x72);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert!(hours.pm());

        // 8 AM in 12-hour mode
        let hours = Hours::from(0x48);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert!(!hours.pm());

        let hours = Hours::from(0x80);
        assert!(hours.any());
    }

    #[test]
    fn test_control_register_conversions() {
        let control = Control::from(0x47);
        assert!(control.write_protect());
        assert!(control.one_hz_output());
        assert!(control.alarm1_interrupt_enable());
        assert!(control.alarm0_interrupt_enable());
        assert_eq!(u8::from(control), 0x47);

        let control = Control::from(0x02);
        assert!(!control.write_protect());
        assert!(!control.one_hz_output());
        assert!(control.alarm_interrupt_enable(Alarm::Alarm1));
        assert!(!control.alarm_interrupt_enable(Alarm::Alarm0));
    }

    #[test]
    fn test_control_register_bitfield_operations() {
        let mut control = Control::from(0x40);
        control.set_write_protect(false);
        assert_eq!(u8::from(control), 0x00);

        control.set_alarm_interrupt_enable(Alarm::Alarm0, true);
        assert_eq!(u8::from(control), 0x01);
        control.set_alarm_interrupt_enable(Alarm::Alarm1, true);
        assert_eq!(u8::from(control), 0x03);
        control.set_one_hz_output(true);
        assert_eq!(u8::from(control), 0x07);
        control.set_alarm_interrupt_enable(Alarm::Alarm0, false);
        assert_eq!(u8::from(control), 0x06);
    }

    #[test]
    fn test_status_register_conversions() {
        let status = Status::from(0x03);
        assert!(status.alarm_flag(Alarm::Alarm0));
        assert!(status.alarm_flag(Alarm::Alarm1));

        let mut status = Status::from(0x02);
        assert!(!status.alarm0_flag());
        assert!(status.alarm1_flag());
        status.set_alarm_flag(Alarm::Alarm1, false);
        assert_eq!(u8::from(status), 0x00);
    }

    #[test]
    fn test_trickle_charge_register_encoding() {
        let tc = TrickleCharge::new(1, 2).unwrap();
        assert_eq!(u8::from(TrickleChargeControl::from(tc)), 0xA5);

        let tc = TrickleCharge::new(2, 8).unwrap();
        assert_eq!(u8::from(TrickleChargeControl::from(tc)), 0xAB);

        let tc = TrickleCharge::new(1, 4).unwrap();
        assert_eq!(u8::from(TrickleChargeControl::from(tc)), 0xA6);
    }

    #[test]
    fn test_trickle_charge_rejects_invalid_parameters() {
        assert_eq!(TrickleCharge::new(0, 2), None);
        assert_eq!(TrickleCharge::new(3, 2), None);
        assert_eq!(TrickleCharge::new(1, 5), None);
        assert_eq!(TrickleCharge::new(2, 0), None);
    }

    #[test]
    fn test_trickle_charge_register_decoding() {
        assert_eq!(
            TrickleChargeControl::from(0xA5).trickle_charge(),
            Some(TrickleCharge {
                diodes: Diodes::One,
                resistor: Resistor::K2,
            })
        );
        assert_eq!(
            TrickleChargeControl::from(0xAB).trickle_charge(),
            Some(TrickleCharge {
                diodes: Diodes::Two,
                resistor: Resistor::K8,
            })
        );
        // Disabled
        assert_eq!(TrickleChargeControl::from(0x00).trickle_charge(), None);
        assert_eq!(TrickleChargeControl::from(0x55).trickle_charge(), None);
        // Enable pattern but no resistor selected
        assert_eq!(TrickleChargeControl::from(0xA4).trickle_charge(), None);
        // Enable pattern but diode field 00 or 11
        assert_eq!(TrickleChargeControl::from(0xA1).trickle_charge(), None);
        assert_eq!(TrickleChargeControl::from(0xAD).trickle_charge(), None);
    }

    #[test]
    fn test_trickle_charge_accessors() {
        let tc = TrickleCharge::new(2, 4).unwrap();
        assert_eq!(tc.diodes.count(), 2);
        assert_eq!(tc.resistor.kohm(), 4);
    }

    #[test]
    fn test_register_roundtrip_conversions() {
        let test_values = [0x00, 0x55, 0xAA, 0xFF, 0x12, 0x47, 0xA5];

        for &value in &test_values {
            assert_eq!(u8::from(Hours::from(value)), value);
            assert_eq!(u8::from(Control::from(value)), value);
            assert_eq!(u8::from(Status::from(value)), value);
            assert_eq!(u8::from(TrickleChargeControl::from(value)), value);
        }
    }

    #[test]
    #[should_panic(expected = "Invalid value for TimeRepresentation: 2")]
    fn test_invalid_time_representation_conversion() {
        let _ = TimeRepresentation::from(2);
    }
}
