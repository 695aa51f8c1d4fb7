use std::sync::atomic::{AtomicBool, Ordering};

use super::Observer;

/// Caps an observer at one terminal notification.
///
/// The first terminal wins its atomic swap and is delivered; the losing
/// terminal and everything after either is dropped silently. An
/// [`on_next`](`Observer::on_next`) racing the terminal may still be
/// delivered: such a value observed the un-stopped flag and was thereby
/// ordered before the terminal, which is all the contract asks.
///
/// Named for [`Iterator::fuse`]'s once-done-always-done behavior.
#[derive(Debug)]
pub struct Fused<O> {
	inner: O,
	stopped: AtomicBool,
}

impl<O> Fused<O> {
	/// Wraps `inner`.
	pub fn new(inner: O) -> Self {
		Self {
			inner,
			stopped: AtomicBool::new(false),
		}
	}

	/// Whether a terminal notification has been delivered.
	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::SeqCst)
	}
}

impl<O: Observer> Observer for Fused<O> {
	type Item = O::Item;
	type Err = O::Err;

	fn on_next(&self, item: Self::Item) {
		// Correctness hangs on the terminal swap alone, so a relaxed read
		// suffices here.
		if !self.stopped.load(Ordering::Relaxed) {
			self.inner.on_next(item);
		}
	}

	fn on_error(&self, error: Self::Err) {
		if !self.stopped.swap(true, Ordering::SeqCst) {
			self.inner.on_error(error);
		}
	}

	fn on_completed(&self) {
		if !self.stopped.swap(true, Ordering::SeqCst) {
			self.inner.on_completed();
		}
	}
}
