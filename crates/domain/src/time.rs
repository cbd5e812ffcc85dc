//! Process-wide monotonic clock.

use std::sync::OnceLock;
use std::time::Instant;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Microseconds elapsed since the first call in this process.
///
/// Monotonic and unaffected by wall-clock adjustments. Event timestamps and
/// the clock projection anchor both come from here, so they are directly
/// comparable.
#[must_use]
pub fn monotonic_us() -> i64 {
    i64::try_from(anchor().elapsed().as_micros()).unwrap_or(i64::MAX)
}
