//! Async implementation of the DS1306 driver.
//!
//! This module provides an async interface to the DS1306 RTC using the
//! `embedded-hal-async` [`SpiBus`]. CE stays a blocking
//! [`OutputPin`](embedded_hal::digital::OutputPin). It is only available
//! when the `async` feature is enabled.
//!
//! Dropping a pending call, for example on a `select!` timeout, drops CE
//! and restores the bus configuration before the next transaction starts.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1306::asynch::DS1306;
//! use ds1306::TimeRepresentation;
//!
//! let mut rtc = DS1306::new(spi, ce, TimeRepresentation::TwentyFourHour);
//! rtc.init().await?;
//!
//! let now = rtc.datetime().await?;
//! ```

use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;
use paste::paste;

use crate::bus::{pin_error, BusConfig, Preconfigured, READ_FILLER, SPI_SETTINGS};
use crate::registers::{ALARM_LEN, DATETIME_LEN, DATETIME_START, WRITE_OFFSET};
use crate::{
    alarm_index, check_user_range, Config, Control, DS1306Alarm, DS1306DateTime, DS1306Error,
    RegAddr, Status, TimeRepresentation, TrickleChargeControl,
};

async fn transfer_byte<SPI: SpiBus<u8>>(spi: &mut SPI, byte: u8) -> Result<u8, SPI::Error> {
    let mut buf = [byte];
    spi.transfer_in_place(&mut buf).await?;
    spi.flush().await?;
    Ok(buf[0])
}

async fn read_bytes<SPI: SpiBus<u8>>(
    spi: &mut SPI,
    address: u8,
    buf: &mut [u8],
) -> Result<(), SPI::Error> {
    transfer_byte(spi, address).await?;
    for b in buf.iter_mut() {
        *b = transfer_byte(spi, READ_FILLER).await?;
    }
    Ok(())
}

async fn write_bytes<SPI: SpiBus<u8>>(spi: &mut SPI, address: u8, data: &[u8]) -> Result<(), SPI::Error> {
    transfer_byte(spi, address).await?;
    for &b in data {
        transfer_byte(spi, b).await?;
    }
    Ok(())
}

struct RegisterBus<SPI, CE, CFG> {
    spi: SPI,
    ce: CE,
    config: CFG,
}

/// An open frame: CE is high and the bus carries [`SPI_SETTINGS`].
///
/// Dropping the frame, including when the future driving it is dropped
/// mid-transfer, drops CE and restores the bus configuration.
struct Frame<'a, SPI, CE, CFG>
where
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    bus: &'a mut RegisterBus<SPI, CE, CFG>,
    saved: Option<CFG::Saved>,
}

impl<SPI, CE, CFG> Frame<'_, SPI, CE, CFG>
where
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    fn spi(&mut self) -> &mut SPI {
        &mut self.bus.spi
    }

    fn close(&mut self) -> Result<(), CE::Error> {
        let released = self.bus.ce.set_low();
        if let Some(saved) = self.saved.take() {
            self.bus.config.restore(&mut self.bus.spi, saved);
        }
        released
    }
}

impl<SPI, CE, CFG> Drop for Frame<'_, SPI, CE, CFG>
where
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    fn drop(&mut self) {
        if self.saved.is_some() {
            warn!("DS1306: frame abandoned, releasing CE");
            let _ = self.close();
        }
    }
}

impl<SPI, CE, CFG> RegisterBus<SPI, CE, CFG>
where
    SPI: SpiBus<u8>,
    CE: OutputPin,
    CFG: BusConfig<SPI>,
{
    fn release_ce(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        self.ce.set_low().map_err(pin_error)
    }

    fn begin(&mut self) -> Result<Frame<'_, SPI, CE, CFG>, DS1306Error<SPI::Error>> {
        let saved = self.config.apply(&mut self.spi, &SPI_SETTINGS);
        if let Err(e) = self.ce.set_high() {
            self.config.restore(&mut self.spi, saved);
            return Err(pin_error(e));
        }
        Ok(Frame {
            bus: self,
            saved: Some(saved),
        })
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), DS1306Error<SPI::Error>> {
        trace!("read {:#x} len={}", address, buf.len());
        let mut frame = self.begin()?;
        let result = read_bytes(frame.spi(), address & !WRITE_OFFSET, buf).await;
        let released = frame.close();
        result?;
        released.map_err(pin_error)
    }

    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), DS1306Error<SPI::Error>> {
        trace!("write {:#x} len={}", address, data.len());
        let mut frame = self.begin()?;
        let result = write_bytes(frame.spi(), address | WRITE_OFFSET, data).await;
        let released = frame.close();
        result?;
        released.map_err(pin_error)
    }
}

/// DS1306 Real-Time Clock async driver.
///
/// Same register protocol and codecs as the blocking [`crate::DS1306`].
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
            bus: RegisterBus { spi, ce, config },
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

    /// Puts CE in its idle state and clears write protection.
    pub async fn init(&mut self) -> Result<(), DS1306Error<SPI::Error>> {
        debug!("DS1306: init");
        self.bus.release_ce()?;
        let mut control = self.control().await?;
        control.set_write_protect(false);
        self.set_control(control).await
    }

    /// Applies `config` to the control and trickle-charge registers.
    pub async fn configure(&mut self, config: &Config) -> Result<(), DS1306Error<SPI::Error>> {
        let mut control = self.control().await?;
        control.set_write_protect(false);
        control.set_one_hz_output(config.one_hz_output);
        control.set_alarm0_interrupt_enable(config.alarm0_interrupt);
        control.set_alarm1_interrupt_enable(config.alarm1_interrupt);
        debug!("DS1306: writing control: {:?}", control);
        self.set_control(control).await?;

        let trickle = config
            .trickle_charge
            .map(TrickleChargeControl::from)
            .unwrap_or_default();
        self.set_trickle_charge_control(trickle).await
    }

    /// Reads `buf.len()` consecutive registers starting at `address`.
    ///
    /// Bit 7 of `address` is the write flag and is cleared before sending.
    pub async fn read_registers(
        &mut self,
        address: u8,
        buf: &mut [u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.read(address, buf).await
    }

    /// Writes `data` to consecutive registers starting at `address`.
    pub async fn write_registers(
        &mut self,
        address: u8,
        data: &[u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.write(address, data).await
    }

    /// Reads one register. Bit 7 of `address` is ignored.
    pub async fn read_register(&mut self, address: u8) -> Result<u8, DS1306Error<SPI::Error>> {
        let mut data = [0];
        self.bus.read(address, &mut data).await?;
        Ok(data[0])
    }

    /// Writes one register.
    pub async fn write_register(
        &mut self,
        address: u8,
        value: u8,
    ) -> Result<(), DS1306Error<SPI::Error>> {
        self.bus.write(address, &[value]).await
    }

    /// Reads the clock/calendar registers.
    pub async fn datetime(&mut self) -> Result<DS1306DateTime, DS1306Error<SPI::Error>> {
        let mut data = [0; DATETIME_LEN];
        self.bus.read(DATETIME_START, &mut data).await?;
        Ok(DS1306DateTime::from_registers(&data))
    }

    /// Writes the clock/calendar registers in this driver's time
    /// representation.
    pub async fn set_datetime(
        &mut self,
        datetime: &DS1306DateTime,
    ) -> Result<(), DS1306Error<SPI::Error>> {
        let data = datetime.to_registers(self.time_representation);
        self.bus.write(DATETIME_START, &data).await
    }

    /// Reads alarm `index` (0 or 1).
    pub async fn alarm(&mut self, index: u8) -> Result<DS1306Alarm, DS1306Error<SPI::Error>> {
        let alarm = alarm_index::<SPI::Error>(index)?;
        let mut data = [0; ALARM_LEN];
        self.bus.read(alarm.address(), &mut data).await?;
        Ok(DS1306Alarm::from_registers(&data))
    }

    /// Writes alarm `index` (0 or 1) in this driver's time representation.
    pub async fn set_alarm(
        &mut self,
        index: u8,
        alarm: &DS1306Alarm,
    ) -> Result<(), DS1306Error<SPI::Error>> {
        let target = alarm_index::<SPI::Error>(index)?;
        let data = alarm.to_registers(self.time_representation);
        self.bus.write(target.address(), &data).await
    }

    /// Writes `data` to user memory at `address` (0x20-0x7E).
    pub async fn write_user(
        &mut self,
        address: u8,
        data: &[u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        check_user_range::<SPI::Error>(address, data.len())?;
        self.bus.write(address, data).await
    }

    /// Reads user memory at `address` (0x20-0x7E) into `buf`. On a range
    /// error `buf` is zeroed.
    pub async fn read_user(
        &mut self,
        address: u8,
        buf: &mut [u8],
    ) -> Result<(), DS1306Error<SPI::Error>> {
        if let Err(e) = check_user_range(address, buf.len()) {
            buf.fill(0);
            return Err(e);
        }
        self.bus.read(address, buf).await
    }
}

// Register access implementations
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
                    pub async fn $name(&mut self) -> Result<$typ, DS1306Error<SPI::Error>> {
                        Ok(<$typ>::from(self.read_register(u8::from($regaddr)).await?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), DS1306Error<SPI::Error>> {
                        self.write_register(u8::from($regaddr), value.into()).await
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

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::bus::tests::{ce_frames, read_frame, write_frame, Event, RecordingConfig};
    use crate::{day_of_week, Hour, Meridiem, TrickleCharge};
    use alloc::vec;
    use alloc::vec::Vec;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTrans,
    };
    use embedded_hal::spi::{ErrorKind as SpiErrorKind, ErrorType};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTrans};

    fn setup_mock(
        frames: &[Vec<SpiTrans<u8>>],
        representation: TimeRepresentation,
    ) -> (SpiMock<u8>, PinMock, DS1306<SpiMock<u8>, PinMock>) {
        let expectations: Vec<SpiTrans<u8>> = frames.iter().flatten().cloned().collect();
        let spi = SpiMock::new(&expectations);
        let ce = PinMock::new(&ce_frames(frames.len()));
        let dev = DS1306::new(spi.clone(), ce.clone(), representation);
        (spi, ce, dev)
    }

    #[tokio::test]
    async fn test_async_init() {
        let expectations: Vec<SpiTrans<u8>> =
            [read_frame(0x0F, &[0x40]), write_frame(0x0F, &[0x00])]
                .into_iter()
                .flatten()
                .collect();
        let mut spi = SpiMock::new(&expectations);
        let mut pin = vec![PinTrans::set(PinState::Low)];
        pin.extend(ce_frames(2));
        let mut ce = PinMock::new(&pin);
        let mut dev = DS1306::new(spi.clone(), ce.clone(), TimeRepresentation::TwentyFourHour);

        dev.init().await.unwrap();
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_configure() {
        let config = Config {
            one_hz_output: false,
            alarm0_interrupt: true,
            alarm1_interrupt: true,
            trickle_charge: TrickleCharge::new(1, 2),
        };
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[
                read_frame(0x0F, &[0x44]),
                write_frame(0x0F, &[0x03]),
                write_frame(0x11, &[0xA5]),
            ],
            TimeRepresentation::TwentyFourHour,
        );

        dev.configure(&config).await.unwrap();
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_read_datetime() {
        // 2024-03-14 3:30:00 PM, Thursday
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[read_frame(
                0x00,
                &[0x00, 0x30, 0x63, 0x05, 0x14, 0x03, 0x24],
            )],
            TimeRepresentation::TwelveHour,
        );

        let dt = dev.datetime().await.unwrap();
        assert_eq!(dt.hours, Hour::TwelveHour(3, Meridiem::Pm));
        assert_eq!(dt.hours.hour24(), 15);
        assert_eq!(dt.minutes, 30);
        assert_eq!(dt.day_of_week, day_of_week::THURSDAY);
        assert_eq!(dt.day, 14);
        assert_eq!(dt.month, 3);
        assert_eq!(dt.year, 24);
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_set_datetime() {
        let dt = DS1306DateTime {
            seconds: 0,
            minutes: 30,
            hours: Hour::TwentyFourHour(15),
            day_of_week: day_of_week::THURSDAY,
            day: 14,
            month: 3,
            year: 24,
        };
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[write_frame(
                0x00,
                &[0x00, 0x30, 0x15, 0x05, 0x14, 0x03, 0x24],
            )],
            TimeRepresentation::TwentyFourHour,
        );

        dev.set_datetime(&dt).await.unwrap();
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_alarms() {
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[
                write_frame(0x0B, &[0x00, 0x00, 0x48, 0x80]),
                read_frame(0x07, &[0x80, 0x80, 0x80, 0x80]),
            ],
            TimeRepresentation::TwelveHour,
        );

        dev.set_alarm(1, &DS1306Alarm::daily(Hour::TwentyFourHour(8), 0, 0))
            .await
            .unwrap();
        assert_eq!(dev.alarm(0).await.unwrap(), DS1306Alarm::every_second());
        assert_eq!(
            dev.alarm(2).await,
            Err(DS1306Error::InvalidAlarmIndex(2))
        );
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_register_operations() {
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[
                read_frame(0x10, &[0x03]),
                write_frame(0x10, &[0x00]),
                read_frame(0x11, &[0xAB]),
                read_frame(0x00, &[0x59, 0x59]),
                write_frame(0x0F, &[0x40]),
            ],
            TimeRepresentation::TwentyFourHour,
        );

        let status = dev.status().await.unwrap();
        assert!(status.alarm0_flag());
        assert!(status.alarm1_flag());
        dev.set_status(Status::default()).await.unwrap();
        let trickle = dev.trickle_charge_control().await.unwrap();
        assert_eq!(
            trickle.trickle_charge(),
            TrickleCharge::new(2, 8)
        );
        let mut buf = [0u8; 2];
        dev.read_registers(0x00, &mut buf).await.unwrap();
        assert_eq!(buf, [0x59, 0x59]);
        dev.write_register(0x0F, 0x40).await.unwrap();
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_user_memory() {
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[
                write_frame(0x30, &[0x01, 0x02, 0x03]),
                read_frame(0x30, &[0x01, 0x02, 0x03]),
            ],
            TimeRepresentation::TwentyFourHour,
        );

        dev.write_user(0x30, &[0x01, 0x02, 0x03]).await.unwrap();
        let mut buf = [0u8; 3];
        dev.read_user(0x30, &mut buf).await.unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);

        let mut buf = [0xFFu8; 2];
        assert_eq!(
            dev.read_user(0x10, &mut buf).await,
            Err(DS1306Error::UserMemoryOutOfRange {
                address: 0x10,
                len: 2
            })
        );
        assert_eq!(buf, [0, 0]);
        spi.done();
        ce.done();
    }

    #[tokio::test]
    async fn test_async_read_clears_write_offset() {
        let (mut spi, mut ce, mut dev) = setup_mock(
            &[read_frame(0x12, &[0x5A])],
            TimeRepresentation::TwentyFourHour,
        );

        assert_eq!(dev.read_register(0x92).await.unwrap(), 0x5A);
        spi.done();
        ce.done();
    }

    /// An SPI bus whose transfers never complete.
    struct StalledSpi;

    impl ErrorType for StalledSpi {
        type Error = SpiErrorKind;
    }

    impl SpiBus<u8> for StalledSpi {
        async fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            core::future::pending().await
        }
        async fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
            core::future::pending().await
        }
        async fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
            core::future::pending().await
        }
        async fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            core::future::pending().await
        }
        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_async_cancelled_transfer_releases_ce() {
        let mut ce = PinMock::new(&[
            PinTrans::set(PinState::High),
            PinTrans::set(PinState::Low),
        ]);
        let config = RecordingConfig::default();
        let events = config.events.clone();
        let mut dev = DS1306::new_with_bus_config(
            StalledSpi,
            ce.clone(),
            config,
            TimeRepresentation::TwentyFourHour,
        );

        // Poll the read once, then drop it mid-frame
        tokio::select! {
            biased;
            _ = dev.status() => panic!("stalled transfer completed"),
            _ = core::future::ready(()) => {}
        }

        assert_eq!(
            *events.borrow(),
            vec![Event::Apply(SPI_SETTINGS), Event::Restore(1)]
        );
        ce.done();
    }
}
