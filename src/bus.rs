//! Framed register transactions over SPI.
//!
//! Every access to the DS1306 is one frame:
//!
//! 1. switch the bus to [`SPI_SETTINGS`] (see [`BusConfig`])
//! 2. raise CE
//! 3. send the address byte, with [`WRITE_OFFSET`] set for writes and
//!    cleared for reads
//! 4. shift N data bytes in or out, one byte at a time
//! 5. drop CE
//! 6. put the bus configuration back
//!
//! CE on the DS1306 is active-high, so the select line is driven directly
//! as an [`OutputPin`] instead of going through `SpiDevice`, which assumes an
//! active-low chip select.
//!
//! A failing transfer still drops CE and restores the bus configuration
//! before the error is returned. There is no timeout: a bus that never
//! completes a transfer blocks the caller.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Mode, SpiBus, MODE_1};

use crate::registers::WRITE_OFFSET;
use crate::DS1306Error;

/// Byte clocked out while reading. The chip ignores it; it is easy to spot
/// on a logic analyzer.
pub const READ_FILLER: u8 = 0xAA;

/// Bit order on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// SPI settings a transaction needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpiSettings {
    /// Clock polarity and phase
    pub mode: Mode,
    /// Bit order
    pub bit_order: BitOrder,
    /// Highest clock rate the device accepts, in Hz
    pub max_frequency_hz: u32,
}

/// Settings required by the DS1306: mode 1 (CPOL = 0, CPHA = 1), MSB first,
/// at most 2 MHz.
pub const SPI_SETTINGS: SpiSettings = SpiSettings {
    mode: MODE_1,
    bit_order: BitOrder::MsbFirst,
    max_frequency_hz: 2_000_000,
};

/// Saves and restores the bus configuration around each transaction.
///
/// `embedded-hal` has no portable way to reconfigure an [`SpiBus`], so this
/// is left to the platform. Implement it when the bus is shared with devices
/// that need other settings; use [`Preconfigured`] when the bus is already set
/// up for the DS1306.
pub trait BusConfig<SPI> {
    /// Snapshot of the configuration in place before [`BusConfig::apply`].
    type Saved;

    /// Switches `spi` to `settings`, returning what was there before.
    fn apply(&mut self, spi: &mut SPI, settings: &SpiSettings) -> Self::Saved;

    /// Puts back a configuration returned by [`BusConfig::apply`].
    fn restore(&mut self, spi: &mut SPI, saved: Self::Saved);
}

/// The bus is already configured with [`SPI_SETTINGS`]; nothing to save.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Preconfigured;

impl<SPI> BusConfig<SPI> for Preconfigured {
    type Saved = ();

    fn apply(&mut self, _spi: &mut SPI, _settings: &SpiSettings) -> Self::Saved {}

    fn restore(&mut self, _spi: &mut SPI, _saved: Self::Saved) {}
}

pub(crate) fn pin_error<SPIE>(e: impl embedded_hal::digital::Error) -> DS1306Error<SPIE> {
    DS1306Error::Pin(e.kind())
}

/// The SPI bus, the chip-enable line and the bus configuration of one DS1306.
pub(crate) struct RegisterBus<SPI, CE, CFG> {
    pub(crate) spi: SPI,
    pub(crate) ce: CE,
    pub(crate) config: CFG,
}

impl<SPI, CE, CFG> RegisterBus<SPI, CE, CFG>
where
    SPI: SpiBus<u8>,
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    pub(crate) fn new(spi: SPI, ce: CE, config: CFG) -> Self {
        Self { spi, ce, config }
    }

    /// Drives CE to its idle (low) level.
    pub(crate) fn release_ce(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        self.ce.set_low().map_err(pin_error)
    }

    /// Reads `buf.len()` consecutive registers starting at `address`.
    ///
    /// Bit 7 of `address` is cleared; with it set the chip would take the
    /// frame as a write.
    pub(crate) fn read(
        &mut self,
        address: u8,
        buf: &mut [u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        trace!("read {:#x} len={}", address, buf.len());
        self.frame(address & !WRITE_OFFSET, |spi| {
            for b in buf.iter_mut() {
                *b = transfer_byte(spi, READ_FILLER)?;
            }
            Ok(())
        })
    }

    /// Writes `data` to consecutive registers starting at `address`.
    pub(crate) fn write(&mut self, address: u8, data: &[u8]) -> Result<(), DS1306Error<SPI::Error>> {
        trace!("write {:#x} len={}", address, data.len());
        self.frame(address | WRITE_OFFSET, |spi| {
            for &b in data {
                transfer_byte(spi, b)?;
            }
            Ok(())
        })
    }

    fn frame<F>(&mut self, address: u8, body: F) -> Result<(), DS1306Error<SPI::Error>>
    where
        F: FnOnce(&mut SPI) -> Result<(), SPI::Error>,
    {
        let saved = self.config.apply(&mut self.spi, &SPI_SETTINGS);
        if let Err(e) = self.ce.set_high() {
            self.config.restore(&mut self.spi, saved);
            return Err(pin_error(e));
        }
        let result = transfer_byte(&mut self.spi, address).and_then(|_| body(&mut self.spi));
        let released = self.ce.set_low();
        self.config.restore(&mut self.spi, saved);
        result?;
        released.map_err(pin_error)
    }
}

/// Shifts one byte out and returns the byte shifted in, blocking until the
/// transfer completes.
fn transfer_byte<SPI: SpiBus<u8>>(spi: &mut SPI, byte: u8) -> Result<u8, SPI::Error> {
    let mut buf = [byte];
    spi.transfer_in_place(&mut buf)?;
    spi.flush()?;
    Ok(buf[0])
}
