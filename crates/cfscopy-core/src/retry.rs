//! Bounded retry with a fixed delay
//!
//! Every mkdir and file copy runs through [`with_retry`]. Attempts are
//! 1-indexed: the first try is "attempt 1 of N". Each failure is recorded as an
//! Error event; once the budget is spent the operation is fatal and the whole
//! run stops.
//!
//! ```text
//! Attempting(n) --ok--------------------> Done
//! Attempting(n) --err, n < max--sleep---> Attempting(n + 1)
//! Attempting(n) --err, n == max---------> Fatal
//! ```

use crate::context::RunContext;
use crate::error::{Error, Result};
use std::path::Path;

/// Position of one operation in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to run (or running) the given attempt, starting at 1
    Attempting(u32),
    /// The operation succeeded
    Done,
    /// Every attempt failed
    Fatal,
}

impl RetryState {
    /// Transition after the current attempt finished
    pub fn advance(self, succeeded: bool, max_attempts: u32) -> Self {
        match self {
            RetryState::Attempting(_) if succeeded => RetryState::Done,
            RetryState::Attempting(n) if n < max_attempts => RetryState::Attempting(n + 1),
            RetryState::Attempting(_) => RetryState::Fatal,
            terminal => terminal,
        }
    }
}

/// Run `operation` under the context's retry policy.
///
/// `target` is the destination path the operation acts on; it appears in each
/// failure event. The closure receives the current 1-indexed attempt number.
pub fn with_retry<T, F>(ctx: &mut RunContext, target: &Path, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let policy = *ctx.policy();
    let max_attempts = policy.max_attempts.max(1);
    let mut state = RetryState::Attempting(1);

    loop {
        let RetryState::Attempting(attempt) = state else {
            unreachable!("terminal states return from the loop");
        };

        let error = match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        ctx.error(format!(
            "Attempt {} of {} failed for {}: {}",
            attempt,
            max_attempts,
            target.display(),
            error
        ));

        state = state.advance(false, max_attempts);
        if state == RetryState::Fatal {
            ctx.error(format!(
                "Maximum attempts reached ({}), aborting run",
                max_attempts
            ));
            return Err(Error::RetriesExhausted {
                path: target.to_path_buf(),
                attempts: attempt,
                source: Box::new(error),
            });
        }

        if !policy.delay.is_zero() {
            tracing::debug!(
                "Waiting {:?} before attempt {} for {:?}",
                policy.delay,
                attempt + 1,
                target
            );
            std::thread::sleep(policy.delay);
        }
    }
}
