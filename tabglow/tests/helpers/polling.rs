use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 50;
const MAX_DELAY_MS: u64 = 1_000;

/// Error returned when a polled condition never became true.
#[derive(Debug)]
pub struct WaitError {
    what: String,
    attempts: u32,
    waited: Duration,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out after {} attempts over {:?} waiting for {}",
            self.attempts, self.waited, self.what
        )
    }
}

impl std::error::Error for WaitError {}

/// Poll `condition` until it returns true or `timeout` elapses.
///
/// Uses exponential backoff starting at 50ms, capped at one second.
pub fn wait_until<F>(what: &str, timeout: Duration, mut condition: F) -> Result<(), WaitError>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition() {
            return Ok(());
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }

        thread::sleep(delay.min(remaining));
        delay = delay
            .checked_mul(2)
            .unwrap_or_else(|| Duration::from_millis(MAX_DELAY_MS))
            .min(Duration::from_millis(MAX_DELAY_MS));
    }

    Err(WaitError {
        what: what.to_string(),
        attempts,
        waited: start.elapsed(),
    })
}
