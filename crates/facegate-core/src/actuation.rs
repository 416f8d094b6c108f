//! Actuation boundary: the binary lock/unlock output.

/// A binary output that locks or unlocks the door.
///
/// Implementations must be idempotent: repeating a value has no effect
/// beyond the first call.
pub trait Actuator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set_unlocked(&mut self, unlocked: bool) -> Result<(), Self::Error>;
}

/// Guard that drives its actuator to locked when dropped, including on
/// early return and panic unwinding.
pub struct FailClosed<'a, A: Actuator> {
    actuator: &'a mut A,
    locked_on_exit: bool,
}

impl<'a, A: Actuator> FailClosed<'a, A> {
    pub fn new(actuator: &'a mut A) -> Self {
        Self {
            actuator,
            locked_on_exit: false,
        }
    }

    pub fn set_unlocked(&mut self, unlocked: bool) -> Result<(), A::Error> {
        self.actuator.set_unlocked(unlocked)
    }

    /// Lock now and report the outcome instead of only logging it on drop.
    pub fn close(mut self) -> Result<(), A::Error> {
        self.locked_on_exit = true;
        self.actuator.set_unlocked(false)
    }
}

impl<A: Actuator> Drop for FailClosed<'_, A> {
    fn drop(&mut self) {
        if self.locked_on_exit {
            return;
        }
        if let Err(err) = self.actuator.set_unlocked(false) {
            tracing::error!(error = %err, "failed to lock on exit");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingActuator;
    use super::*;

    #[test]
    fn test_drop_locks() {
        let mut act = RecordingActuator::default();
        {
            let mut guard = FailClosed::new(&mut act);
            guard.set_unlocked(true).unwrap();
        }
        assert_eq!(act.calls, vec![true, false]);
    }

    #[test]
    fn test_close_locks_once() {
        let mut act = RecordingActuator::default();
        let mut guard = FailClosed::new(&mut act);
        guard.set_unlocked(true).unwrap();
        guard.close().unwrap();
        assert_eq!(act.calls, vec![true, false]);
    }

    #[test]
    fn test_drop_locks_during_panic() {
        let mut act = RecordingActuator::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = FailClosed::new(&mut act);
            guard.set_unlocked(true).unwrap();
            panic!("frame processing blew up");
        }));
        assert!(result.is_err());
        assert_eq!(act.calls, vec![true, false]);
    }
}
