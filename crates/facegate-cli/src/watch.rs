//! Multi-worker webcam recognition.
//!
//! One capture thread feeds a bounded queue holding at most one frame per
//! worker. Each worker owns its own oracle sidecar. Results come back out of
//! order and are re-emitted in capture order; the measured frame rate sets a
//! small per-worker delay that smooths the output cadence.

use anyhow::{Context, Result};
use facegate_core::door::FrameError;
use facegate_core::{CancellationToken, Config, DetectedFace, KnownFace, SidecarOracle, ToleranceMatcher};
use facegate_hw::feed::camera_fault;
use facegate_hw::{label_frame, Camera, Frame};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(10);
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Rolling frame-rate estimate over the last `window` frame intervals.
pub struct FpsMeter {
    intervals: VecDeque<Duration>,
    window: usize,
    last: Option<Instant>,
}

impl FpsMeter {
    pub fn new(window: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(window),
            window: window.max(1),
            last: None,
        }
    }

    /// Record a frame emitted at `now`; returns the updated rate once two
    /// frames have been seen.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        let prev = self.last.replace(now)?;
        self.intervals.push_back(now.saturating_duration_since(prev));
        while self.intervals.len() > self.window {
            self.intervals.pop_front();
        }
        let total: f32 = self.intervals.iter().map(Duration::as_secs_f32).sum();
        (total > 0.0).then(|| self.intervals.len() as f32 / total)
    }
}

/// Delay before each worker picks up a frame. Slow pipelines get a larger
/// share of the frame period so output is evenly spaced; fast ones get none
/// so the delay does not cap the rate.
pub fn frame_delay(fps: f32) -> Duration {
    let ratio = if fps < 6.0 {
        0.75
    } else if fps < 20.0 {
        0.5
    } else if fps < 30.0 {
        0.25
    } else {
        return Duration::ZERO;
    };
    Duration::from_secs_f32(ratio / fps)
}

/// Re-sequences items tagged with consecutive frame numbers.
///
/// A result that never arrives (its worker died) would stall the output, so
/// once more than `max_pending` later items are waiting the gap is skipped.
pub struct Reorder<T> {
    next: u64,
    max_pending: usize,
    pending: BTreeMap<u64, T>,
}

impl<T> Reorder<T> {
    pub fn new(first: u64, max_pending: usize) -> Self {
        Self {
            next: first,
            max_pending: max_pending.max(1),
            pending: BTreeMap::new(),
        }
    }

    /// Accept item `seq` and return every item now ready, in order.
    pub fn push(&mut self, seq: u64, item: T) -> Vec<(u64, T)> {
        if seq < self.next {
            tracing::warn!(seq, next = self.next, "dropping late result");
            return Vec::new();
        }
        self.pending.insert(seq, item);
        let mut ready = Vec::new();
        loop {
            while let Some(item) = self.pending.remove(&self.next) {
                ready.push((self.next, item));
                self.next += 1;
            }
            if self.pending.len() <= self.max_pending {
                break;
            }
            if let Some(&oldest) = self.pending.keys().next() {
                tracing::warn!(missing = self.next, resume = oldest, "result never arrived; skipping");
                self.next = oldest;
            }
        }
        ready
    }
}

struct WorkerResult {
    seq: u64,
    worker: usize,
    faces: Result<Vec<DetectedFace>, FrameError>,
}

/// Run the webcam demo until `exit` is cancelled or a fatal fault occurs.
pub fn run(config: &Config, workers: usize, gallery: Vec<KnownFace>, exit: CancellationToken) -> Result<()> {
    let workers = workers.max(1);
    let camera = Camera::open(&config.camera_device, config.frame_width, config.frame_height)
        .context("failed to open camera")?;
    tracing::info!(width = camera.width, height = camera.height, workers, "starting webcam recognition");

    let gallery = Arc::new(gallery);
    let matcher = ToleranceMatcher {
        tolerance: config.match_tolerance,
    };
    let delay_us = Arc::new(AtomicU64::new(0));

    let (frame_tx, frame_rx) = mpsc::sync_channel::<(u64, Frame)>(workers);
    let frame_rx = Arc::new(Mutex::new(frame_rx));
    let (result_tx, result_rx) = mpsc::channel::<WorkerResult>();

    let mut handles = Vec::with_capacity(workers + 1);
    for id in 1..=workers {
        let oracle = SidecarOracle::spawn(&config.oracle_program, &config.oracle_args, config.scratch_frame(id))
            .with_context(|| format!("failed to start oracle for worker {id}"))?;
        let ctx = WorkerContext {
            id,
            oracle,
            matcher,
            gallery: Arc::clone(&gallery),
            frames: Arc::clone(&frame_rx),
            results: result_tx.clone(),
            delay_us: Arc::clone(&delay_us),
            exit: exit.clone(),
        };
        handles.push(
            std::thread::Builder::new()
                .name(format!("facegate-worker-{id}"))
                .spawn(move || ctx.run())
                .context("failed to spawn worker")?,
        );
    }
    drop(frame_rx);
    drop(result_tx);

    handles.push(spawn_capture(camera, frame_tx, exit.clone())?);

    display(result_rx, workers, &delay_us, &exit);

    exit.cancel();
    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("pipeline thread panicked");
        }
    }
    Ok(())
}

fn spawn_capture(camera: Camera, tx: SyncSender<(u64, Frame)>, exit: CancellationToken) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("facegate-capture".into())
        .spawn(move || {
            let mut seq = 0u64;
            'capture: while !exit.is_cancelled() {
                let frame = match camera.capture_frame() {
                    Ok(frame) => frame,
                    Err(err) => match camera_fault(err) {
                        FrameError::Sensor(msg) => {
                            tracing::warn!(error = %msg, "capture failed; retrying");
                            std::thread::sleep(POLL);
                            continue;
                        }
                        FrameError::Fatal(msg) => {
                            tracing::error!(error = %msg, "camera lost; stopping");
                            exit.cancel();
                            break;
                        }
                    },
                };

                let mut item = (seq, frame);
                loop {
                    match tx.try_send(item) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            if exit.is_cancelled() {
                                break 'capture;
                            }
                            item = back;
                            std::thread::sleep(POLL);
                        }
                        Err(TrySendError::Disconnected(_)) => break 'capture,
                    }
                }
                seq += 1;
            }
            tracing::debug!(frames = seq, "capture thread exiting");
        })
        .context("failed to spawn capture thread")
}

struct WorkerContext {
    id: usize,
    oracle: SidecarOracle,
    matcher: ToleranceMatcher,
    gallery: Arc<Vec<KnownFace>>,
    frames: Arc<Mutex<Receiver<(u64, Frame)>>>,
    results: mpsc::Sender<WorkerResult>,
    delay_us: Arc<AtomicU64>,
    exit: CancellationToken,
}

impl WorkerContext {
    fn run(mut self) {
        while !self.exit.is_cancelled() {
            let next = match self.frames.lock() {
                Ok(rx) => rx.recv_timeout(RECV_TIMEOUT),
                Err(_) => break,
            };
            let (seq, frame) = match next {
                Ok(item) => item,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let delay = Duration::from_micros(self.delay_us.load(Ordering::Relaxed));
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            let faces = label_frame(&mut self.oracle, &self.matcher, &self.gallery, &frame);
            let fatal = matches!(faces, Err(FrameError::Fatal(_)));
            let sent = self.results.send(WorkerResult {
                seq,
                worker: self.id,
                faces,
            });
            if fatal || sent.is_err() {
                break;
            }
        }
        tracing::debug!(worker = self.id, "worker exiting");
    }
}

fn display(results: Receiver<WorkerResult>, workers: usize, delay_us: &AtomicU64, exit: &CancellationToken) {
    let mut reorder = Reorder::new(0, workers);
    let mut fps = FpsMeter::new(5 * workers);

    while !exit.is_cancelled() {
        let result = match results.recv_timeout(RECV_TIMEOUT) {
            Ok(r) => r,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        for (seq, (worker, faces)) in reorder.push(result.seq, (result.worker, result.faces)) {
            match faces {
                Ok(faces) => {
                    for face in &faces {
                        match face.bbox {
                            Some(bbox) => println!("ID {worker}: frame {seq}: found {}'s face at {bbox}", face.label),
                            None => println!("ID {worker}: frame {seq}: found {}'s face", face.label),
                        }
                    }
                }
                Err(FrameError::Sensor(msg)) => {
                    tracing::warn!(worker, seq, error = %msg, "frame skipped");
                }
                Err(FrameError::Fatal(msg)) => {
                    tracing::error!(worker, seq, error = %msg, "worker failed; stopping");
                    exit.cancel();
                }
            }

            if let Some(rate) = fps.tick(Instant::now()) {
                let delay = frame_delay(rate);
                delay_us.store(delay.as_micros() as u64, Ordering::Relaxed);
                tracing::info!(delay_ms = delay.as_millis() as u64, "fps: {rate:.2}");
            }
        }
    }
}
