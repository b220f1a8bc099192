//! Bounded polling against device state.

use crate::config::PollPolicy;

/// Where the delay goes relative to each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelayMode {
    /// Between attempts only; the first attempt runs immediately.
    Between,
    /// Before every attempt, including the first.
    BeforeEach,
}

#[derive(Debug)]
pub(crate) struct PollOutcome<T> {
    pub value: Option<T>,
    pub attempts: u32,
}

/// Run `attempt` until it yields a value or the policy's attempts run out.
///
/// `attempt` receives the number of attempts left after the current one.
/// Delays block the calling thread.
pub(crate) fn poll<T>(
    policy: &PollPolicy,
    mode: DelayMode,
    mut attempt: impl FnMut(u32) -> Option<T>,
) -> PollOutcome<T> {
    let mut attempts = 0;

    while attempts < policy.attempts {
        if mode == DelayMode::BeforeEach || attempts > 0 {
            std::thread::sleep(policy.delay());
        }
        attempts += 1;

        if let Some(value) = attempt(policy.attempts - attempts) {
            return PollOutcome {
                value: Some(value),
                attempts,
            };
        }
    }

    PollOutcome {
        value: None,
        attempts,
    }
}
