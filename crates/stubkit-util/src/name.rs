//! Unique resource names built from a prefix and a nanosecond timestamp.
//!
//! Names follow the pattern `{prefix}{nanos}`, for example
//! `bucket1760601234567891234`. Timestamps are strictly increasing within
//! the process, so back-to-back calls never collide even when the wall
//! clock resolution is coarser than a nanosecond.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_NANOS: AtomicI64 = AtomicI64::new(0);

/// Current wall clock time in nanoseconds, bumped past the last value handed out.
fn next_nanos() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut last = LAST_NANOS.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_NANOS.compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return candidate,
            Err(current) => last = current,
        }
    }
}

/// Create a unique name from a prefix and the current time in nanoseconds.
///
/// # Example
///
/// ```rust
/// use stubkit_util::make_unique_name;
///
/// let name = make_unique_name("bucket");
/// assert!(name.starts_with("bucket"));
/// assert_ne!(name, make_unique_name("bucket"));
/// ```
pub fn make_unique_name(prefix: &str) -> String {
    format!("{}{}", prefix, next_nanos())
}
