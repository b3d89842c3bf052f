//! A platform-agnostic driver for the DS1306 serial alarm real-time clock.
//!
//! The DS1306 is an SPI RTC with a BCD clock/calendar, two time-of-day
//! alarms with interrupt outputs, a 1 Hz output, a trickle charger for a
//! backup supply and 96 bytes of battery-backed user memory.
//!
//! # Features
//!
//! - Blocking driver on `embedded-hal` 1.0 [`SpiBus`](embedded_hal::spi::SpiBus)
//! - Async driver on `embedded-hal-async` behind the `async` feature
//! - 12- and 24-hour hour encoding chosen per instance
//! - Alarms with per-field wildcards
//! - Optional logging through `log` or `defmt`
//!
//! # Chip enable
//!
//! CE is active-high and is driven by the driver itself through an
//! [`OutputPin`](embedded_hal::digital::OutputPin). Hand the driver the bare
//! bus and the CE pin, not an `SpiDevice`.
//!
//! The bus must be set up for [`SPI_SETTINGS`](bus::SPI_SETTINGS). If it is
//! shared with devices that need other settings, implement
//! [`BusConfig`](bus::BusConfig) and pass it to
//! [`DS1306::new_with_bus_config`]; each transaction then switches the bus
//! over and back.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1306::{DS1306, DS1306Alarm, Hour, TimeRepresentation};
//!
//! let mut rtc = DS1306::new(spi, ce, TimeRepresentation::TwentyFourHour);
//! rtc.init()?;
//!
//! let now = rtc.datetime()?;
//!
//! rtc.set_alarm(0, &DS1306Alarm::daily(Hour::TwentyFourHour(7), 30, 0))?;
//! rtc.enable_alarm(0)?;
//! ```

#![no_std]

mod fmt;

pub mod alarm;
#[cfg(feature = "async")]
pub mod asynch;
pub mod bcd;
pub mod bus;
pub mod datetime;
pub mod hour;
pub mod registers;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use paste::paste;

pub use crate::alarm::{Alarm, AlarmField, DS1306Alarm, InvalidAlarmIndex};
use crate::bus::RegisterBus;
pub use crate::bus::{BusConfig, Preconfigured, SpiSettings, SPI_SETTINGS};
pub use crate::datetime::{day_of_week, DS1306DateTime, DateTimeError};
pub use crate::hour::{Hour, Meridiem};
pub use crate::registers::{
    Control, Diodes, RegAddr, Resistor, Status, TimeRepresentation, TrickleCharge,
    TrickleChargeControl,
};
use crate::registers::{user_range_contains, ALARM_LEN, DATETIME_LEN, DATETIME_START};

/// Runtime configuration applied by [`DS1306::configure`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Drive the 1 Hz output pin
    pub one_hz_output: bool,
    /// Assert INT0 when alarm 0 fires
    pub alarm0_interrupt: bool,
    /// Assert INT1 when alarm 1 fires
    pub alarm1_interrupt: bool,
    /// Trickle-charge setting; `None` disables the charger
    pub trickle_charge: Option<TrickleCharge>,
}

/// Error type for DS1306 operations.
#[derive(Debug, PartialEq)]
pub enum DS1306Error<SPIE> {
    /// SPI bus error
    Spi(SPIE),
    /// The CE pin could not be driven
    Pin(embedded_hal::digital::ErrorKind),
    /// Alarm index other than 0 or 1; nothing was sent to the chip
    InvalidAlarmIndex(u8),
    /// Unsupported trickle-charge combination; nothing was sent to the chip
    InvalidTrickleCharge {
        /// Requested diode count
        diodes: u8,
        /// Requested resistance in kΩ
        resistance_kohm: u8,
    },
    /// Access outside user memory; nothing was sent to the chip
    UserMemoryOutOfRange {
        /// Requested start address
        address: u8,
        /// Requested length
        len: usize,
    },
}

impl<SPIE> From<SPIE> for DS1306Error<SPIE> {
    fn from(e: SPIE) -> Self {
        DS1306Error::Spi(e)
    }
}

pub(crate) fn alarm_index<SPIE>(index: u8) -> Result<Alarm, DS1306Error<SPIE>> {
    Alarm::try_from(index).map_err(|InvalidAlarmIndex(i)| {
        warn!("invalid alarm index {}", i);
        DS1306Error::InvalidAlarmIndex(i)
    })
}

pub(crate) fn trickle_charge_setting<SPIE>(
    diodes: u8,
    resistance_kohm: u8,
) -> Result<TrickleCharge, DS1306Error<SPIE>> {
    TrickleCharge::new(diodes, resistance_kohm).ok_or_else(|| {
        warn!(
            "unsupported trickle charge: {} diodes, {} kohm",
            diodes, resistance_kohm
        );
        DS1306Error::InvalidTrickleCharge {
            diodes,
            resistance_kohm,
        }
    })
}

pub(crate) fn check_user_range<SPIE>(address: u8, len: usize) -> Result<(), DS1306Error<SPIE>> {
    if user_range_contains(address, len) {
        Ok(())
    } else {
        warn!("user memory access out of range: {:#x} len={}", address, len);
        Err(DS1306Error::UserMemoryOutOfRange { address, len })
    }
}

/// DS1306 Real-Time Clock driver.
///
/// Owns the SPI bus, the CE pin and the bus configuration until
/// [`DS1306::release`]. The time representation is fixed at construction and
/// decides the hour shape written by [`DS1306::set_datetime`] and
/// [`DS1306::set_alarm`]; reads accept either shape.
pub struct DS1306<SPI, CE, CFG = Preconfigured> {
    bus: RegisterBus<SPI, CE, CFG>,
    time_representation: TimeRepresentation,
}

impl<SPI, CE> DS1306<SPI, CE, Preconfigured>
where
    SPI: SpiBus<u8>,
    CE: OutputPin,
{
    /// Creates a driver for a bus already set up with [`SPI_SETTINGS`].
    pub fn new(spi: SPI, ce: CE, time_representation: TimeRepresentation) -> Self {
        Self::new_with_bus_config(spi, ce, Preconfigured, time_representation)
    }
}

impl<SPI, CE, CFG> DS1306<SPI, CE, CFG>
where
    SPI: SpiBus<u8>,
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    /// Creates a driver that switches the bus configuration around every
    /// transaction.
    pub fn new_with_bus_config(
        spi: SPI,
        ce: CE,
        config: CFG,
        time_representation: TimeRepresentation,
    ) -> Self {
        Self {
            bus: RegisterBus::new(spi, ce, config),
            time_representation,
        }
    }

    /// Releases the bus, the CE pin and the bus configuration.
    pub fn release(self) -> (SPI, CE, CFG) {
        (self.bus.spi, self.bus.ce, self.bus.config)
    }

    /// The hour shape this driver writes.
    pub fn time_representation(&self) -> TimeRepresentation {
        self.time_representation
    }

    /// Puts CE in its idle state and clears write protection so the clock
    /// registers can be written.
    pub fn init(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        debug!("DS1306: init");
        self.bus.release_ce()?;
        let mut control = self.control()?;
        control.set_write_protect(false);
        self.set_control(control)
    }

    /// Applies `config` to the control and trickle-charge registers.
    ///
    /// Write protection is cleared as part of the control update.
    pub fn configure(&mut self, config: &Config) -> Result<(), DS1306Error<SPI::Error>> {
        let mut control = self.control()?;
        control.set_write_protect(false);
        control.set_one_hz_output(config.one_hz_output);
        control.set_alarm0_interrupt_enable(config.alarm0_interrupt);
        control.set_alarm1_interrupt_enable(config.alarm1_interrupt);
        debug!("DS1306: writing control: {:?}", control);
        self.set_control(control)?;

        let trickle = config
            .trickle_charge
            .map(TrickleChargeControl::from)
            .unwrap_or_default();
        debug!("DS1306: writing trickle charge: {:#x}", u8::from(trickle));
        self.set_trickle_charge_control(trickle)
    }

    /// Reads `buf.len()` consecutive registers starting at `address`.
    ///
    /// Bit 7 of `address` is the write flag and is cleared before sending.
    pub fn read_registers(
        &mut self,
        address: u8,
        buf: &mut [u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.read(address, buf)
    }

    /// Writes `data` to consecutive registers starting at `address`.
    pub fn write_registers(&mut self, address: u8, data: &[u8]) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.write(address, data)
    }

    /// Reads one register. Bit 7 of `address` is ignored.
    pub fn read_register(&mut self, address: u8) -> Result<u8, DS1306Error<SPI::Error>> {
        let mut data = [0];
        self.bus.read(address, &mut data)?;
        Ok(data[0])
    }

    /// Writes one register.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.write(address, &[value])
    }

    /// Reads the clock/calendar registers.
    ///
    /// Values are returned as stored; nothing is checked against the calendar.
    pub fn datetime(&mut self) -> Result<DS1306DateTime, DS1306Error<SPI::Error>> {
        let mut data = [0; DATETIME_LEN];
        self.bus.read(DATETIME_START, &mut data)?;
        Ok(DS1306DateTime::from_registers(&data))
    }

    /// Writes the clock/calendar registers, with the hour in this driver's
    /// time representation.
    pub fn set_datetime(&mut self, datetime: &DS1306DateTime) -> Result<(), DS1306Error<SPI::Error>> {
        let data = datetime.to_registers(self.time_representation);
        self.bus.write(DATETIME_START, &data)
    }

    /// Reads alarm `index` (0 or 1).
    ///
    /// An invalid index fails before any bus traffic. Callers that prefer
    /// the cleared record in that case can use `unwrap_or_default()`.
    pub fn alarm(&mut self, index: u8) -> Result<DS1306Alarm, DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        let mut data = [0; ALARM_LEN];
        self.bus.read(alarm.address(), &mut data)?;
        Ok(DS1306Alarm::from_registers(&data))
    }

    /// Writes alarm `index` (0 or 1), with the hour in this driver's time
    /// representation.
    pub fn set_alarm(&mut self, index: u8, alarm: &DS1306Alarm) -> Result<(), DS1306Error<SPI::Error>> {
        let target = alarm_index::<SPI::Error>(index)?;
        let data = alarm.to_registers(self.time_representation);
        self.bus.write(target.address(), &data)
    }

    /// Returns `true` if alarm `index` has fired and not been cleared.
    pub fn alarm_triggered(&mut self, index: u8) -> Result<bool, DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        Ok(self.status()?.alarm_flag(alarm))
    }

    /// Fired flags of alarm 0 and alarm 1.
    pub fn alarms_triggered(&mut self) -> Result<(bool, bool), DS1306Error<SPI::Error>> {
        let status = self.status()?;
        Ok((status.alarm0_flag(), status.alarm1_flag()))
    }

    /// Clears the fired flag of alarm `index`.
    pub fn clear_alarm(&mut self, index: u8) -> Result<(), DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        let mut status = self.status()?;
        status.set_alarm_flag(alarm, false);
        self.set_status(status)
    }

    /// Clears the fired flags of both alarms.
    pub fn clear_alarms(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        self.set_status(Status::default())
    }

    /// Returns `true` if the interrupt output of alarm `index` is enabled.
    pub fn alarm_enabled(&mut self, index: u8) -> Result<bool, DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        Ok(self.control()?.alarm_interrupt_enable(alarm))
    }

    /// Interrupt enables of alarm 0 and alarm 1.
    pub fn alarms_enabled(&mut self) -> Result<(bool, bool), DS1306Error<SPI::Error>> {
        let control = self.control()?;
        Ok((
            control.alarm0_interrupt_enable(),
            control.alarm1_interrupt_enable(),
        ))
    }

    /// Enables the interrupt output of alarm `index`.
    pub fn enable_alarm(&mut self, index: u8) -> Result<(), DS1306Error<SPI::Error>> {
        self.set_alarm_enabled(index, true)
    }

    /// Disables the interrupt output of alarm `index`.
    pub fn disable_alarm(&mut self, index: u8) -> Result<(), DS1306Error<SPI::Error>> {
        self.set_alarm_enabled(index, false)
    }

    /// Enables the interrupt outputs of both alarms.
    pub fn enable_alarms(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        self.set_alarms_enabled(true)
    }

    /// Disables the interrupt outputs of both alarms.
    pub fn disable_alarms(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        self.set_alarms_enabled(false)
    }

    fn set_alarm_enabled(&mut self, index: u8, enabled: bool) -> Result<(), DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        let mut control = self.control()?;
        control.set_alarm_interrupt_enable(alarm, enabled);
        self.set_control(control)
    }

    fn set_alarms_enabled(&mut self, enabled: bool) -> Result<(), DS1306Error<SPI::Error>> {
        let mut control = self.control()?;
        control.set_alarm0_interrupt_enable(enabled);
        control.set_alarm1_interrupt_enable(enabled);
        self.set_control(control)
    }

    /// Returns `true` if the 1 Hz output is enabled.
    pub fn one_hz_output(&mut self) -> Result<bool, DS1306Error<SPI::Error>> {
        Ok(self.control()?.one_hz_output())
    }

    /// Enables or disables the 1 Hz output.
    pub fn set_one_hz_output(&mut self, enabled: bool) -> Result<(), DS1306Error<SPI::Error>> {
        let mut control = self.control()?;
        control.set_one_hz_output(enabled);
        self.set_control(control)
    }

    /// Returns `true` if register writes are locked.
    pub fn is_write_protected(&mut self) -> Result<bool, DS1306Error<SPI::Error>> {
        Ok(self.control()?.write_protect())
    }

    /// Locks or unlocks register writes. Only the control register accepts
    /// writes while locked.
    pub fn set_write_protection(&mut self, protect: bool) -> Result<(), DS1306Error<SPI::Error>> {
        debug!("DS1306: write protect = {}", protect);
        let mut control = self.control()?;
        control.set_write_protect(protect);
        self.set_control(control)
    }

    /// Enables the trickle charger with `diodes` (1 or 2) in series with a
    /// `resistance_kohm` (2, 4 or 8) resistor.
    ///
    /// Any other combination fails without touching the chip.
    pub fn enable_trickle_charge(
        &mut self,
        diodes: u8,
        resistance_kohm: u8,
    ) -> Result<(), DS1306Error<SPI::Error>> {
        let setting = trickle_charge_setting::<SPI::Error>(diodes, resistance_kohm)?;
        self.set_trickle_charge(setting)
    }

    /// Enables the trickle charger with `setting`.
    pub fn set_trickle_charge(&mut self, setting: TrickleCharge) -> Result<(), DS1306Error<SPI::Error>> {
        debug!("DS1306: trickle charge {:?}", setting);
        self.set_trickle_charge_control(setting.into())
    }

    /// Disables the trickle charger.
    pub fn disable_trickle_charge(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        debug!("DS1306: trickle charge off");
        self.set_trickle_charge_control(TrickleChargeControl::default())
    }

    /// Current trickle-charge setting, or `None` if charging is off.
    pub fn trickle_charge(&mut self) -> Result<Option<TrickleCharge>, DS1306Error<SPI::Error>> {
        Ok(self.trickle_charge_control()?.trickle_charge())
    }

    /// Writes `data` to user memory at `address` (0x20-0x7E).
    ///
    /// A range that leaves user memory fails without touching the chip.
    pub fn write_user(&mut self, address: u8, data: &[u8]) -> Result<(), DS1306Error<SPI::Error>> {
        check_user_range::<SPI::Error>(address, data.len())?;
        self.bus.write(address, data)
    }

    /// Reads user memory at `address` (0x20-0x7E) into `buf`.
    ///
    /// A range that leaves user memory fails without touching the chip and
    /// leaves `buf` zeroed.
    pub fn read_user(&mut self, address: u8, buf: &mut [u8]) -> Result<(), DS1306Error<SPI::Error>> {
        if let Err(e) = check_user_range(address, buf.len()) {
            buf.fill(0);
            return Err(e);
        }
        self.bus.read(address, buf)
    }
}

// Typed access to single-byte registers
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<SPI, CE, CFG> DS1306<SPI, CE, CFG>
        where
            SPI: SpiBus<u8>,
            CE: OutputPin,
            CFG: BusConfig<SPI>,
        {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, DS1306Error<SPI::Error>> {
                        Ok(<$typ>::from(self.read_register(u8::from($regaddr))?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), DS1306Error<SPI::Error>> {
                        self.write_register(u8::from($regaddr), value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (control, RegAddr::Control, Control),
    (status, RegAddr::Status, Status),
    (
        trickle_charge_control,
        RegAddr::TrickleCharge,
        TrickleChargeControl
    )
);
