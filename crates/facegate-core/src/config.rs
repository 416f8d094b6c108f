use crate::identity::DEFAULT_MAX_SCORE;
use crate::matcher::DEFAULT_TOLERANCE;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration shared by the daemon and the CLI, loaded from
/// `FACEGATE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture size; the driver may negotiate another.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Directory holding one reference image per known person.
    pub known_people_dir: PathBuf,
    /// Consecutive recognitions required before unlocking.
    pub max_score: u32,
    /// Euclidean distance at or below which two encodings match.
    pub match_tolerance: f32,
    /// Oracle sidecar program and arguments.
    pub oracle_program: String,
    pub oracle_args: Vec<String>,
    /// Directory for per-process scratch frames handed to the oracle.
    pub scratch_dir: PathBuf,
    /// I2C character device the GrovePi is attached to.
    pub i2c_bus: String,
    /// GrovePi I2C slave address.
    pub grovepi_address: u16,
    /// GrovePi digital port wired to the door relay.
    pub relay_pin: u8,
    /// GrovePi digital port wired to the push switch.
    pub switch_pin: u8,
    /// Switch polling interval for the switch/relay demo.
    pub switch_poll_ms: u64,
    /// Recognition workers for the webcam demo.
    pub workers: usize,
    /// Refuse to drive GPIO on anything but a Raspberry Pi.
    pub require_pi: bool,
}

impl Config {
    /// Load configuration from the process environment with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let oracle_command = lookup("FACEGATE_ORACLE_COMMAND")
            .unwrap_or_else(|| "facegate-oracle".to_string());
        let mut words = oracle_command.split_whitespace().map(str::to_string);
        let oracle_program = words.next().unwrap_or_else(|| "facegate-oracle".to_string());
        let oracle_args = words.collect();

        Self {
            camera_device: lookup("FACEGATE_CAMERA_DEVICE")
                .unwrap_or_else(|| "/dev/video0".to_string()),
            frame_width: env_parse(&lookup, "FACEGATE_FRAME_WIDTH", 320u32),
            frame_height: env_parse(&lookup, "FACEGATE_FRAME_HEIGHT", 240u32),
            known_people_dir: lookup("FACEGATE_KNOWN_PEOPLE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("known-people")),
            max_score: env_parse(&lookup, "FACEGATE_MAX_SCORE", DEFAULT_MAX_SCORE).max(1),
            match_tolerance: env_parse(&lookup, "FACEGATE_MATCH_TOLERANCE", DEFAULT_TOLERANCE),
            oracle_program,
            oracle_args,
            scratch_dir: lookup("FACEGATE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            i2c_bus: lookup("FACEGATE_I2C_BUS").unwrap_or_else(|| "/dev/i2c-1".to_string()),
            grovepi_address: lookup("FACEGATE_GROVEPI_ADDRESS")
                .and_then(|v| parse_address(&v))
                .unwrap_or(0x04),
            relay_pin: env_parse(&lookup, "FACEGATE_RELAY_PIN", 4u8),
            switch_pin: env_parse(&lookup, "FACEGATE_SWITCH_PIN", 3u8),
            switch_poll_ms: env_parse(&lookup, "FACEGATE_SWITCH_POLL_MS", 10u64),
            workers: lookup("FACEGATE_WORKERS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(default_workers),
            require_pi: lookup("FACEGATE_REQUIRE_PI")
                .map(|v| v.trim() != "0")
                .unwrap_or(true),
        }
    }

    /// Scratch frame path for oracle instance `slot` of this process.
    pub fn scratch_frame(&self, slot: usize) -> PathBuf {
        self.scratch_dir
            .join(format!("facegate-frame-{}-{slot}.png", std::process::id()))
    }
}

/// One worker per CPU, keeping one CPU for capture; never fewer than two.
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    if cpus > 2 {
        cpus - 1
    } else {
        2
    }
}

/// Parse `key` directly into `T`; missing, malformed or out-of-range values
/// give `default`.
fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_address(v: &str) -> Option<u16> {
    let v = v.trim();
    match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => v.parse().ok(),
    }
}
