//! At-most-once scheduled actions.

use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

use parking_lot::Mutex;

use crate::subscription::Subscription;

type Work = Box<dyn 'static + Send + FnOnce() -> Subscription>;

/// A scheduled action that can be discarded before or during dispatch.
///
/// [`invoke`](`DiscardableAction::invoke`) runs the underlying action at
/// most once and retains the subscription it returns. The
/// [`handle`](`DiscardableAction::handle`) drops an action that has not
/// been dispatched yet (it then never runs) and cancels an
/// already-dispatched action's work through that retained subscription.
#[derive(Clone)]
pub struct DiscardableAction(Arc<Mutex<ActionState>>);

struct ActionState {
	work: Option<Work>,
	inner: Option<Subscription>,
	discarded: bool,
}

impl DiscardableAction {
	/// Wraps `work` for a single dispatch.
	pub fn new(work: impl 'static + Send + FnOnce() -> Subscription) -> Self {
		Self(Arc::new(Mutex::new(ActionState {
			work: Some(Box::new(work)),
			inner: None,
			discarded: false,
		})))
	}

	/// Runs the action unless it already ran or was discarded.
	///
	/// If a discard lands while the action is running, the subscription the
	/// action returns is cancelled instead of retained.
	pub fn invoke(&self) {
		let work = self.0.lock().work.take();
		let Some(work) = work else { return };
		let inner = work();
		let stale = {
			let mut state = self.0.lock();
			if state.discarded {
				Some(inner)
			} else {
				state.inner = Some(inner);
				None
			}
		};
		if let Some(stale) = stale {
			stale.cancel();
		}
	}

	/// The cancellation handle exposed to callers of a scheduling
	/// operation.
	pub fn handle(&self) -> Subscription {
		let this = self.clone();
		Subscription::new(move || this.discard())
	}

	fn discard(&self) {
		let (work, inner) = {
			let mut state = self.0.lock();
			state.discarded = true;
			(state.work.take(), state.inner.take())
		};
		// The undispatched closure may own arbitrary state; drop it (and
		// cancel dispatched work) outside the lock.
		drop(work);
		if let Some(inner) = inner {
			inner.cancel();
		}
	}
}

impl Debug for DiscardableAction {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.0.lock();
		f.debug_struct("DiscardableAction")
			.field("ready", &state.work.is_some())
			.field("discarded", &state.discarded)
			.finish()
	}
}
