//! The process-wide monotonic clock the real schedulers share.

use std::{
	sync::OnceLock,
	thread,
	time::{Duration, Instant},
};

fn epoch() -> Instant {
	static EPOCH: OnceLock<Instant> = OnceLock::new();
	*EPOCH.get_or_init(Instant::now)
}

/// Time elapsed since the clock's first use in this process.
pub(crate) fn monotonic_now() -> Duration {
	epoch().elapsed()
}

/// The [`Instant`] at which the clock will read `due`.
pub(crate) fn instant_at(due: Duration) -> Instant {
	epoch() + due
}

/// Blocks the calling thread until the clock reads at least `due`.
///
/// This is the blocking half of delayed dispatch; the event loop's deadline
/// wait is the cooperative half.
pub(crate) fn sleep_until(due: Duration) {
	loop {
		let now = monotonic_now();
		let Some(remaining) = due.checked_sub(now) else {
			return;
		};
		if remaining.is_zero() {
			return;
		}
		thread::sleep(remaining);
	}
}
