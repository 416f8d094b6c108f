//! Push switch mirrored onto the relay.

use facegate_core::CancellationToken;
use facegate_hw::{BusError, GroveRelay, GroveSwitch, I2cBus};
use std::time::Duration;

/// Poll `switch` every `interval` and drive `relay` to match until `token`
/// is cancelled. Bus errors are logged and polling continues. The relay is
/// switched off before returning.
pub fn mirror<S: I2cBus, R: I2cBus>(
    switch: &mut GroveSwitch<S>,
    relay: &mut GroveRelay<R>,
    interval: Duration,
    token: &CancellationToken,
) -> Result<(), BusError> {
    tracing::info!("starting read loop");

    while !token.is_cancelled() {
        match switch.is_pressed() {
            Ok(pressed) => {
                let changed = relay.state() != Some(pressed);
                match relay.set(pressed) {
                    Ok(()) if changed => tracing::info!(pressed, "Relay {}!", if pressed { "on" } else { "off" }),
                    Ok(()) => {}
                    Err(err) => tracing::warn!(error = %err, "relay write failed"),
                }
            }
            Err(err) => tracing::warn!(error = %err, "switch read failed"),
        }
        std::thread::sleep(interval);
    }

    tracing::info!("stopping read loop");
    relay.set(false)
}
