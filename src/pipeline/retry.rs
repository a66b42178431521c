use anyhow::Result;
use log::warn;
use std::thread;
use std::time::{Duration, Instant};

// Granularity at which a waiting retry notices a stop request.
const WAIT_SLICE: Duration = Duration::from_secs(1);

/// Fixed-count, fixed-delay retry for transient collaborator faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the attempts are used up; the last
    /// error is returned. `op` receives the 1-based attempt number.
    pub fn run<T>(&self, what: &str, op: impl FnMut(u32) -> Result<T>) -> Result<T> {
        self.run_while(what, || true, op)
    }

    /// Like [`RetryPolicy::run`], but gives up as soon as `keep_going`
    /// turns false, including while waiting between attempts.
    pub fn run_while<T>(
        &self,
        what: &str,
        keep_going: impl Fn() -> bool,
        mut op: impl FnMut(u32) -> Result<T>,
    ) -> Result<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts => {
                    warn!(
                        "{what} failed (attempt {attempt}/{attempts}): {e:#}; retrying in {:?}",
                        self.delay
                    );
                    if !wait(self.delay, &keep_going) {
                        return Err(e.context(format!("{what} interrupted after {attempt} attempts")));
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e.context(format!("{what} failed after {attempts} attempts"))),
            }
        }
    }
}

/// Sleep for `total` in slices; false when `keep_going` turned false.
fn wait(total: Duration, keep_going: &impl Fn() -> bool) -> bool {
    let until = Instant::now() + total;
    loop {
        if !keep_going() {
            return false;
        }
        let now = Instant::now();
        if now >= until {
            return true;
        }
        thread::sleep(WAIT_SLICE.min(until - now));
    }
}
