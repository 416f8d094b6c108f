use facegate_core::enrollment::{self, EnrollError};
use facegate_core::{
    progress, run_door, Actuator, CancellationToken, Config, ConfirmationGate, DoorError,
    DoorSummary, OracleError, SidecarOracle, ToleranceMatcher,
};
use facegate_hw::{BusError, Camera, CameraError, CameraFeed, GrovePi, GroveRelay, LinuxI2c};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not running on a Raspberry Pi (set FACEGATE_REQUIRE_PI=0 to override)")]
    NotRaspberryPi,
    #[error("relay error: {0}")]
    Relay(#[from] BusError),
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("enrollment error: {0}")]
    Enroll(#[from] EnrollError),
    #[error("failed to spawn door thread: {0}")]
    Thread(std::io::Error),
}

/// Outcome of the door thread, delivered once it stops.
pub type DoorOutcome = oneshot::Receiver<Result<DoorSummary, DoorError>>;

/// Bring up the relay, camera and oracle, enroll known people, then run the
/// door loop on a dedicated OS thread until `token` is cancelled.
///
/// Fails fast if any resource is unavailable. The relay is locked before
/// anything else is touched.
pub fn spawn_door(config: &Config, token: CancellationToken) -> Result<DoorOutcome, EngineError> {
    if config.require_pi && !facegate_hw::is_raspberry_pi() {
        return Err(EngineError::NotRaspberryPi);
    }

    let bus = LinuxI2c::open(&config.i2c_bus, config.grovepi_address)?;
    let mut relay = GroveRelay::new(GrovePi::new(bus), config.relay_pin)?;
    relay.set_unlocked(false)?;
    tracing::info!(bus = %config.i2c_bus, pin = config.relay_pin, "relay locked");

    let camera = Camera::open(&config.camera_device, config.frame_width, config.frame_height)?;
    tracing::info!(
        device = %config.camera_device,
        width = camera.width,
        height = camera.height,
        fourcc = ?camera.fourcc,
        "camera opened"
    );

    let mut oracle = SidecarOracle::spawn(
        &config.oracle_program,
        &config.oracle_args,
        config.scratch_frame(0),
    )?;

    let enrolled = progress::step("Learning known faces", || {
        let refs = enrollment::discover_references(&config.known_people_dir)?;
        enrollment::enroll(&refs, &mut oracle, config.max_score)
    })?;
    if enrolled.gallery.is_empty() {
        tracing::warn!(
            dir = %config.known_people_dir.display(),
            "no known faces enrolled; the door will stay locked"
        );
    }

    let mut gate = ConfirmationGate::new(enrolled.registry, config.max_score);
    let matcher = ToleranceMatcher {
        tolerance: config.match_tolerance,
    };
    let mut feed = CameraFeed::new(camera, oracle, matcher, enrolled.gallery);

    let (tx, rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("facegate-door".into())
        .spawn(move || {
            tracing::info!("door thread started");
            let result = run_door(&mut feed, &mut gate, &mut relay, &token);
            tracing::info!("door thread exiting");
            let _ = tx.send(result);
        })
        .map_err(EngineError::Thread)?;

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_pi_host_refused_before_touching_hardware() {
        let config = Config {
            require_pi: true,
            i2c_bus: "/dev/i2c-does-not-exist".into(),
            ..Config::from_lookup(|_| None)
        };
        if facegate_hw::is_raspberry_pi() {
            return;
        }
        let err = spawn_door(&config, CancellationToken::new()).err().unwrap();
        assert!(matches!(err, EngineError::NotRaspberryPi));
        assert!(err.to_string().contains("FACEGATE_REQUIRE_PI=0"));
    }

    #[test]
    fn test_relay_open_failure_surfaces_bus_error() {
        let config = Config {
            require_pi: false,
            i2c_bus: "/dev/i2c-does-not-exist".into(),
            ..Config::from_lookup(|_| None)
        };
        let err = spawn_door(&config, CancellationToken::new()).err().unwrap();
        assert!(matches!(err, EngineError::Relay(BusError::Open { .. })));
    }
}
