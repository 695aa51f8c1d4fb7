use std::sync::Arc;

use millrace::queue_lock::QueueLock;

use super::{Fused, Observer};

/// Serializes notifications by deferring them through a [`QueueLock`].
///
/// Every notification, including one a producer issues while already
/// inside its own, is pushed onto the gate's queue, and whichever thread
/// finds the gate idle drains it. Re-entrant work therefore runs *after*
/// the current notification returns rather than nested inside it: stack
/// depth stays bounded and producers are served FIFO. Contrast
/// [`Synchronized`](`super::Synchronized`), which re-enters inline.
///
/// Terminal finality is enforced by an inner [`Fused`] layer, so anything
/// queued behind a terminal notification is dropped silently when its turn
/// comes.
pub struct Queued<O> {
	target: Arc<Fused<O>>,
	gate: Arc<QueueLock>,
}

impl<O> Clone for Queued<O> {
	fn clone(&self) -> Self {
		Self {
			target: Arc::clone(&self.target),
			gate: Arc::clone(&self.gate),
		}
	}
}

impl<O> Queued<O> {
	/// Wraps `inner` behind a private gate.
	pub fn new(inner: O) -> Self {
		Self::with_gate(inner, Arc::new(QueueLock::new()))
	}

	/// Wraps `inner` behind a shared `gate`.
	///
	/// Several observers on one gate are serialized *together*: across all
	/// of them, one notification runs at a time.
	pub fn with_gate(inner: O, gate: Arc<QueueLock>) -> Self {
		Self {
			target: Arc::new(Fused::new(inner)),
			gate,
		}
	}
}

impl<O> Observer for Queued<O>
where
	O: 'static + Observer + Send + Sync,
	O::Item: 'static + Send,
	O::Err: 'static + Send,
{
	type Item = O::Item;
	type Err = O::Err;

	fn on_next(&self, item: Self::Item) {
		let target = Arc::clone(&self.target);
		self.gate.enqueue(move || target.on_next(item));
	}

	fn on_error(&self, error: Self::Err) {
		let target = Arc::clone(&self.target);
		self.gate.enqueue(move || target.on_error(error));
	}

	fn on_completed(&self) {
		let target = Arc::clone(&self.target);
		self.gate.enqueue(move || target.on_completed());
	}
}
