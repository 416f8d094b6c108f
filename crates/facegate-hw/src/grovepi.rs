//! GrovePi digital I/O over Linux I2C.
//!
//! The GrovePi firmware takes 4-byte commands written to register 1:
//! `[0x01, cmd, pin, value, 0]`. Digital reads are followed by a one-byte
//! read of the pin level.

use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use thiserror::Error;

/// `I2C_SLAVE` from `<linux/i2c-dev.h>`: bind the fd to a slave address.
const I2C_SLAVE: libc::c_ulong = 0x0703;

const REGISTER: u8 = 0x01;
const CMD_DIGITAL_READ: u8 = 1;
const CMD_DIGITAL_WRITE: u8 = 2;
const CMD_PIN_MODE: u8 = 5;
const UNUSED: u8 = 0;

/// Highest digital port on the GrovePi (D2–D8; D0/D1 are the UART).
pub const MAX_DIGITAL_PIN: u8 = 8;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to open I2C bus {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to select I2C address {address:#04x}: {source}")]
    SetAddress {
        address: u16,
        source: std::io::Error,
    },
    #[error("I2C transfer failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GrovePi digital pin D{0}")]
    InvalidPin(u8),
}

/// Raw byte transport to one I2C slave.
pub trait I2cBus {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()>;
}

/// `/dev/i2c-N` character device bound to one slave address.
pub struct LinuxI2c {
    file: File,
}

impl LinuxI2c {
    pub fn open(path: &str, address: u16) -> Result<Self, BusError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| BusError::Open {
                path: path.to_string(),
                source,
            })?;

        // SAFETY:
        // - fd is valid for the lifetime of `file`
        // - I2C_SLAVE takes the address by value, no pointers are passed
        let ret = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE, libc::c_ulong::from(address)) };
        if ret < 0 {
            return Err(BusError::SetAddress {
                address,
                source: std::io::Error::last_os_error(),
            });
        }

        tracing::debug!(path, address, "I2C bus opened");
        Ok(Self { file })
    }
}

impl I2cBus for LinuxI2c {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.read_exact(buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// GrovePi board command set.
pub struct GrovePi<B> {
    bus: B,
}

impl<B: I2cBus> GrovePi<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), BusError> {
        let value = match mode {
            PinMode::Input => 0,
            PinMode::Output => 1,
        };
        self.command(CMD_PIN_MODE, pin, value)
    }

    pub fn digital_write(&mut self, pin: u8, high: bool) -> Result<(), BusError> {
        self.command(CMD_DIGITAL_WRITE, pin, u8::from(high))
    }

    pub fn digital_read(&mut self, pin: u8) -> Result<bool, BusError> {
        self.command(CMD_DIGITAL_READ, pin, UNUSED)?;
        let mut level = [0u8; 1];
        self.bus.read(&mut level)?;
        Ok(level[0] != 0)
    }

    fn command(&mut self, cmd: u8, pin: u8, value: u8) -> Result<(), BusError> {
        if pin > MAX_DIGITAL_PIN {
            return Err(BusError::InvalidPin(pin));
        }
        self.bus.write(&[REGISTER, cmd, pin, value, UNUSED])?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        &self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Records writes and serves queued read bytes.
    #[derive(Default)]
    pub struct FakeBus {
        pub writes: Vec<Vec<u8>>,
        pub reads: VecDeque<u8>,
        pub fail_writes: usize,
    }

    impl I2cBus for FakeBus {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            if self.fail_writes > 0 {
                self.fail_writes -= 1;
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "nack"));
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
            for b in buf.iter_mut() {
                *b = self
                    .reads
                    .pop_front()
                    .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no data"))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBus;
    use super::*;

    #[test]
    fn test_pin_mode_output_bytes() {
        let mut board = GrovePi::new(FakeBus::default());
        board.pin_mode(4, PinMode::Output).unwrap();
        board.pin_mode(3, PinMode::Input).unwrap();
        assert_eq!(board.bus().writes, vec![vec![1, 5, 4, 1, 0], vec![1, 5, 3, 0, 0]]);
    }

    #[test]
    fn test_digital_write_bytes() {
        let mut board = GrovePi::new(FakeBus::default());
        board.digital_write(4, true).unwrap();
        board.digital_write(4, false).unwrap();
        assert_eq!(board.bus().writes, vec![vec![1, 2, 4, 1, 0], vec![1, 2, 4, 0, 0]]);
    }

    #[test]
    fn test_digital_read() {
        let mut bus = FakeBus::default();
        bus.reads.extend([1, 0]);
        let mut board = GrovePi::new(bus);
        assert!(board.digital_read(3).unwrap());
        assert!(!board.digital_read(3).unwrap());
        assert_eq!(board.bus().writes[0], vec![1, 1, 3, 0, 0]);
    }

    #[test]
    fn test_invalid_pin_rejected() {
        let mut board = GrovePi::new(FakeBus::default());
        assert!(matches!(board.digital_write(9, true), Err(BusError::InvalidPin(9))));
        assert!(board.bus().writes.is_empty());
    }

    #[test]
    fn test_open_missing_bus() {
        let err = LinuxI2c::open("/dev/i2c-does-not-exist", 4).err().unwrap();
        assert!(matches!(err, BusError::Open { .. }));
    }
}
