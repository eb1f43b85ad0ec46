#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in `lease_pool`.
//!
//! Pool tests deliberately put threads to sleep in blocking acquires. A bug in the wake-up logic
//! shows up as a hang rather than a failure, so tests run under [`with_watchdog()`] and use
//! [`wait_until()`] / [`stays_false()`] instead of fixed sleeps wherever possible.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// How long a thread has to stay stuck before we conclude that it is blocked.
///
/// Blocking can only be observed as "nothing happened for a while", so this is a tradeoff
/// between test duration and false confidence on a heavily loaded machine.
pub const BLOCKED_THRESHOLD: Duration = Duration::from_millis(100);

/// How long [`wait_until()`] waits for its condition before giving up.
const WAIT_UNTIL_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Runs a test with a timeout to prevent infinite hangs.
///
/// If the test takes longer than the timeout to complete, the test fails instead of hanging
/// the build.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri, where thread
/// synchronization primitives are significantly slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled and
/// the test function is executed directly. This allows mutation testing to properly detect
/// hanging mutations.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode) or if the test
/// itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout - probably stuck in a blocking call");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Polls `condition` until it returns `true`.
///
/// # Panics
///
/// Panics if the condition is still `false` after a few seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now()
        .checked_add(WAIT_UNTIL_TIMEOUT)
        .expect("a few seconds from now is representable");

    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition did not become true within {WAIT_UNTIL_TIMEOUT:?}"
        );

        thread::sleep(POLL_INTERVAL);
    }
}

/// Polls `condition` for [`BLOCKED_THRESHOLD`] and returns whether it stayed `false` throughout.
///
/// Use this to check that another thread is blocked: have the thread set a flag once it gets
/// past the blocking call and check that the flag stays unset.
#[must_use]
pub fn stays_false(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now()
        .checked_add(BLOCKED_THRESHOLD)
        .expect("a fraction of a second from now is representable");

    while Instant::now() < deadline {
        if condition() {
            return false;
        }

        thread::sleep(POLL_INTERVAL);
    }

    !condition()
}
