use anyhow::{Context, Result};
use facegate_core::{CancellationToken, Config, StopReason};
use tracing_subscriber::EnvFilter;

mod engine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(
        camera = %config.camera_device,
        known_people = %config.known_people_dir.display(),
        max_score = config.max_score,
        tolerance = config.match_tolerance,
        "facegated starting"
    );

    let token = CancellationToken::new();
    let mut done = engine::spawn_door(&config, token.clone()).context("startup failed")?;

    tracing::info!("facegated ready");

    let outcome = tokio::select! {
        outcome = &mut done => outcome,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("facegated shutting down");
            token.cancel();
            (&mut done).await
        }
    };

    let summary = outcome
        .context("door thread vanished")?
        .context("door loop failed")?;

    tracing::info!(
        frames = summary.frames,
        unlocked_frames = summary.unlocked_frames,
        sensor_faults = summary.sensor_faults,
        cancelled = summary.stop == StopReason::Cancelled,
        "facegated stopped; door locked"
    );
    Ok(())
}
