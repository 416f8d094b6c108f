//! Named, timed startup steps ("Loading people database...done").

use std::time::Instant;

/// Run `f` as a named step, logging its start, completion and duration.
pub fn step<T>(msg: &str, f: impl FnOnce() -> T) -> T {
    tracing::info!("{msg}...");
    let started = Instant::now();
    let out = f();
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "{msg}...done");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_returns_value() {
        assert_eq!(step("Adding", || 2 + 2), 4);
    }
}
