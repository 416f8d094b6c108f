use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facegate_core::enrollment::{self, Enrollment, SkipReason};
use facegate_core::{progress, run_door, CancellationToken, Config, ConfirmationGate, IdentityRegistry, SidecarOracle};
use facegate_hw::{Camera, GrovePi, GroveRelay, GroveSwitch, LinuxI2c};
use std::path::PathBuf;
use std::time::Duration;

mod replay;
mod switch;
mod watch;

#[derive(Parser)]
#[command(name = "facegate", about = "facegate door-unlock diagnostics and demos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll the known-people directory and report who was learned
    Enroll {
        /// Directory of reference images (default: FACEGATE_KNOWN_PEOPLE_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Feed recorded label frames through the confirmation gate
    Replay {
        /// Line-delimited JSON label frames, e.g. ["alice", "unknown"]
        file: PathBuf,
        /// Consecutive recognitions required to unlock
        #[arg(long)]
        max_score: Option<u32>,
    },
    /// Mirror the push switch onto the relay
    SwitchRelay,
    /// Recognize faces from the webcam with a pool of workers
    Watch {
        /// Number of recognition workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Enroll { dir } => {
            let dir = dir.unwrap_or_else(|| config.known_people_dir.clone());
            let enrolled = load_known_faces(&config, &dir)?;
            for face in &enrolled.gallery {
                println!("enrolled  {}", face.name);
            }
            for (reference, reason) in &enrolled.skipped {
                let why = match reason {
                    SkipReason::NoFaceFound => "no face found".to_string(),
                    SkipReason::OracleFault(msg) => msg.clone(),
                    SkipReason::DuplicateName => "duplicate name".to_string(),
                };
                println!("skipped   {} ({}): {why}", reference.name, reference.path.display());
            }
        }
        Commands::Replay { file, max_score } => {
            let max_score = max_score.unwrap_or(config.max_score).max(1);
            let reader = std::io::BufReader::new(
                std::fs::File::open(&file).with_context(|| format!("cannot open {}", file.display()))?,
            );
            let mut source = replay::ReplaySource::new(reader);
            let mut gate = ConfirmationGate::new(IdentityRegistry::new(), max_score);
            let mut log = replay::DecisionLog::default();

            let summary = run_door(&mut source, &mut gate, &mut log, &CancellationToken::new())?;
            for (i, unlocked) in log.decisions.iter().take(summary.frames as usize).enumerate() {
                println!("frame {:>4}: {}", i + 1, if *unlocked { "UNLOCKED" } else { "locked" });
            }
            println!("final state: {:?}; door locked", gate.state());
        }
        Commands::SwitchRelay => {
            require_pi(&config)?;
            let mut switch = GroveSwitch::new(
                GrovePi::new(LinuxI2c::open(&config.i2c_bus, config.grovepi_address)?),
                config.switch_pin,
            )?;
            let mut relay = GroveRelay::new(
                GrovePi::new(LinuxI2c::open(&config.i2c_bus, config.grovepi_address)?),
                config.relay_pin,
            )?;
            let interval = Duration::from_millis(config.switch_poll_ms);

            run_until_ctrl_c(move |token| {
                switch::mirror(&mut switch, &mut relay, interval, &token).map_err(Into::into)
            })
            .await?;
        }
        Commands::Watch { workers } => {
            let workers = workers.unwrap_or(config.workers);
            let enrolled = load_known_faces(&config, &config.known_people_dir)?;
            let gallery = enrolled.gallery;
            run_until_ctrl_c(move |token| watch::run(&config, workers, gallery, token)).await?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("no V4L2 capture devices found");
            }
            for d in devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

fn require_pi(config: &Config) -> Result<()> {
    if config.require_pi && !facegate_hw::is_raspberry_pi() {
        bail!("only Raspberry Pi is supported (set FACEGATE_REQUIRE_PI=0 to override)");
    }
    Ok(())
}

fn load_known_faces(config: &Config, dir: &std::path::Path) -> Result<Enrollment> {
    let mut oracle = SidecarOracle::spawn(&config.oracle_program, &config.oracle_args, config.scratch_frame(0))
        .context("failed to start face oracle")?;
    progress::step("Learning known faces", || {
        let refs = enrollment::discover_references(dir)?;
        enrollment::enroll(&refs, &mut oracle, config.max_score)
    })
    .context("enrollment failed")
}

/// Run a blocking loop on its own thread, cancelling it on ctrl-c.
async fn run_until_ctrl_c<F>(f: F) -> Result<()>
where
    F: FnOnce(CancellationToken) -> Result<()> + Send + 'static,
{
    let token = CancellationToken::new();
    let mut task = tokio::task::spawn_blocking({
        let token = token.clone();
        move || f(token)
    });

    tokio::select! {
        res = &mut task => return res.context("worker thread panicked")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("interrupted; stopping");
            token.cancel();
        }
    }

    task.await.context("worker thread panicked")?
}
