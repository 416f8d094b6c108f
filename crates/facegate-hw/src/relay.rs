//! Grove relay and switch on GrovePi digital ports.

use crate::grovepi::{BusError, GrovePi, I2cBus, PinMode};
use facegate_core::Actuator;

/// Door relay. Energized means unlocked.
pub struct GroveRelay<B> {
    board: GrovePi<B>,
    pin: u8,
    /// Last level successfully written; `None` until the first write or
    /// after a failed one.
    state: Option<bool>,
}

impl<B: I2cBus> GroveRelay<B> {
    /// Configure `pin` as an output. The relay state is unknown until the
    /// first `set`.
    pub fn new(mut board: GrovePi<B>, pin: u8) -> Result<Self, BusError> {
        board.pin_mode(pin, PinMode::Output)?;
        Ok(Self {
            board,
            pin,
            state: None,
        })
    }

    /// Drive the relay, skipping the bus write if it already holds `on`.
    pub fn set(&mut self, on: bool) -> Result<(), BusError> {
        if self.state == Some(on) {
            return Ok(());
        }
        self.state = None;
        self.board.digital_write(self.pin, on)?;
        self.state = Some(on);
        tracing::debug!(pin = self.pin, on, "relay switched");
        Ok(())
    }

    pub fn state(&self) -> Option<bool> {
        self.state
    }
}

impl<B: I2cBus> Actuator for GroveRelay<B> {
    type Error = BusError;

    fn set_unlocked(&mut self, unlocked: bool) -> Result<(), BusError> {
        self.set(unlocked)
    }
}

/// Momentary push switch read as a digital input.
pub struct GroveSwitch<B> {
    board: GrovePi<B>,
    pin: u8,
}

impl<B: I2cBus> GroveSwitch<B> {
    pub fn new(mut board: GrovePi<B>, pin: u8) -> Result<Self, BusError> {
        board.pin_mode(pin, PinMode::Input)?;
        Ok(Self { board, pin })
    }

    pub fn is_pressed(&mut self) -> Result<bool, BusError> {
        self.board.digital_read(self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grovepi::testing::FakeBus;

    fn relay() -> GroveRelay<FakeBus> {
        GroveRelay::new(GrovePi::new(FakeBus::default()), 4).unwrap()
    }

    fn writes(r: &GroveRelay<FakeBus>) -> Vec<Vec<u8>> {
        r.board.bus().writes.clone()
    }

    #[test]
    fn test_new_sets_output_mode() {
        let r = relay();
        assert_eq!(writes(&r), vec![vec![1, 5, 4, 1, 0]]);
        assert_eq!(r.state(), None);
    }

    #[test]
    fn test_set_unlocked_is_idempotent() {
        let mut r = relay();
        r.set_unlocked(true).unwrap();
        r.set_unlocked(true).unwrap();
        r.set_unlocked(false).unwrap();
        r.set_unlocked(false).unwrap();
        assert_eq!(
            writes(&r),
            vec![vec![1, 5, 4, 1, 0], vec![1, 2, 4, 1, 0], vec![1, 2, 4, 0, 0]]
        );
    }

    #[test]
    fn test_first_lock_always_written() {
        let mut r = relay();
        r.set_unlocked(false).unwrap();
        assert_eq!(writes(&r).len(), 2);
        assert_eq!(r.state(), Some(false));
    }

    #[test]
    fn test_failed_write_is_retried() {
        let mut r = relay();
        r.board_bus_mut().fail_writes = 1;
        assert!(r.set_unlocked(true).is_err());
        assert_eq!(r.state(), None);
        r.set_unlocked(true).unwrap();
        assert_eq!(r.state(), Some(true));
        assert_eq!(writes(&r).last().unwrap(), &vec![1, 2, 4, 1, 0]);
    }

    #[test]
    fn test_switch_reads_level() {
        let mut bus = FakeBus::default();
        bus.reads.extend([0, 1]);
        let mut sw = GroveSwitch::new(GrovePi::new(bus), 3).unwrap();
        assert!(!sw.is_pressed().unwrap());
        assert!(sw.is_pressed().unwrap());
    }

    impl GroveRelay<FakeBus> {
        fn board_bus_mut(&mut self) -> &mut FakeBus {
            self.board.bus_mut()
        }
    }
}
