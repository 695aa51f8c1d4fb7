use std::sync::Arc;

use parking_lot::ReentrantMutex;

use super::Observer;

/// Serializes notifications from any number of producers under a reentrant
/// mutex.
///
/// Cross-thread callers exclude one another for the whole delegate call.
/// Same-thread re-entry (a delegate notifying the observer it is being
/// driven by, as synchronous multicast emission does) acquires the mutex
/// again and runs *inline*, nested on the stack. Contrast
/// [`Queued`](`super::Queued`), which defers such notifications to run
/// after the current one instead.
pub struct Synchronized<O> {
	inner: Arc<ReentrantMutex<O>>,
}

impl<O> Clone for Synchronized<O> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<O> Synchronized<O> {
	/// Wraps `inner`; clones of the result share one mutex and one
	/// delegate.
	pub fn new(inner: O) -> Self {
		Self {
			inner: Arc::new(ReentrantMutex::new(inner)),
		}
	}
}

impl<O: Observer> Observer for Synchronized<O> {
	type Item = O::Item;
	type Err = O::Err;

	fn on_next(&self, item: Self::Item) {
		self.inner.lock().on_next(item);
	}

	fn on_error(&self, error: Self::Err) {
		self.inner.lock().on_error(error);
	}

	fn on_completed(&self) {
		self.inner.lock().on_completed();
	}
}
