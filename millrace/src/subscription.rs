//! Cancelable handles for work in flight.

use std::{
	fmt::{self, Debug, Formatter},
	mem,
	sync::Arc,
};

use parking_lot::Mutex;

type CancelFn = Box<dyn 'static + Send + FnOnce()>;

/// A cancelable handle to work in flight.
///
/// Clones share the same work. The first [`cancel`](`Subscription::cancel`)
/// across all clones releases it; every later call is a no-op, from any
/// thread. A cancel racing the work's dispatch settles on exactly one side.
#[derive(Clone)]
#[must_use = "A subscription that is neither kept nor cancelled leaks the ability to release its work."]
pub struct Subscription(Arc<Mutex<Option<CancelFn>>>);

impl Subscription {
	/// Wraps `on_cancel` so that it runs at most once, on the first
	/// [`cancel`](`Subscription::cancel`).
	pub fn new(on_cancel: impl 'static + Send + FnOnce()) -> Self {
		Self(Arc::new(Mutex::new(Some(Box::new(on_cancel)))))
	}

	/// A subscription over no work at all.
	///
	/// It reports itself cancelled from the start and cancelling it has no
	/// effect.
	pub fn empty() -> Self {
		Self(Arc::new(Mutex::new(None)))
	}

	/// Releases the work this handle represents.
	///
	/// The cancel routine runs on the calling thread. Exactly one caller
	/// runs it, no matter how often or from where this is invoked.
	pub fn cancel(&self) {
		let on_cancel = self.0.lock().take();
		if let Some(on_cancel) = on_cancel {
			on_cancel();
		}
	}

	/// Whether the cancel routine has already run (or never existed).
	pub fn is_cancelled(&self) -> bool {
		self.0.lock().is_none()
	}

	fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

/// Aggregates child [`Subscription`]s under one cancellation domain.
///
/// Cancelling the composite cancels every current child and every child
/// [`add`](`CompositeSubscription::add`)ed afterwards.
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<CompositeState>>);

#[derive(Default)]
struct CompositeState {
	cancelled: bool,
	children: Vec<Subscription>,
}

impl CompositeSubscription {
	/// An empty, un-cancelled composite.
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches `child`.
	///
	/// If the composite is already cancelled, `child` is cancelled
	/// immediately instead of being retained.
	pub fn add(&self, child: Subscription) {
		{
			let mut state = self.0.lock();
			if !state.cancelled {
				state.children.push(child);
				return;
			}
		}
		child.cancel();
	}

	/// Detaches `child` (compared by handle identity) and cancels it.
	///
	/// Removing a subscription that was never added has no effect.
	pub fn remove(&self, child: &Subscription) {
		let detached = {
			let mut state = self.0.lock();
			state
				.children
				.iter()
				.position(|candidate| candidate.ptr_eq(child))
				.map(|index| state.children.swap_remove(index))
		};
		if let Some(detached) = detached {
			detached.cancel();
		}
	}

	/// Cancels all current children and marks the composite so that future
	/// children are cancelled on arrival.
	pub fn cancel(&self) {
		let children = {
			let mut state = self.0.lock();
			state.cancelled = true;
			mem::take(&mut state.children)
		};
		for child in children {
			child.cancel();
		}
	}

	/// Whether [`cancel`](`CompositeSubscription::cancel`) has run.
	pub fn is_cancelled(&self) -> bool {
		self.0.lock().cancelled
	}

	/// A plain [`Subscription`] that cancels this composite.
	pub fn to_subscription(&self) -> Subscription {
		let this = self.clone();
		Subscription::new(move || this.cancel())
	}
}

impl Debug for CompositeSubscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.0.lock();
		f.debug_struct("CompositeSubscription")
			.field("cancelled", &state.cancelled)
			.field("children", &state.children.len())
			.finish()
	}
}

/// Holds at most one child [`Subscription`] in a replaceable slot.
///
/// Assigning through [`replace`](`ReplaceableSubscription::replace`)
/// cancels the previously held child. Once the slot itself is cancelled,
/// every incoming child is cancelled instead of stored.
#[derive(Clone, Default)]
pub struct ReplaceableSubscription(Arc<Mutex<ReplaceableState>>);

#[derive(Default)]
struct ReplaceableState {
	cancelled: bool,
	current: Option<Subscription>,
}

impl ReplaceableSubscription {
	/// An empty, un-cancelled slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `child`, cancelling whatever the slot held before.
	pub fn replace(&self, child: Subscription) {
		let displaced = {
			let mut state = self.0.lock();
			if state.cancelled {
				Some(child)
			} else {
				state.current.replace(child)
			}
		};
		if let Some(displaced) = displaced {
			displaced.cancel();
		}
	}

	/// Cancels the held child, if any, and poisons the slot against future
	/// assignments.
	pub fn cancel(&self) {
		let current = {
			let mut state = self.0.lock();
			state.cancelled = true;
			state.current.take()
		};
		if let Some(current) = current {
			current.cancel();
		}
	}

	/// Whether [`cancel`](`ReplaceableSubscription::cancel`) has run.
	pub fn is_cancelled(&self) -> bool {
		self.0.lock().cancelled
	}

	/// A plain [`Subscription`] that cancels this slot.
	pub fn to_subscription(&self) -> Subscription {
		let this = self.clone();
		Subscription::new(move || this.cancel())
	}
}

impl Debug for ReplaceableSubscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.0.lock();
		f.debug_struct("ReplaceableSubscription")
			.field("cancelled", &state.cancelled)
			.field("occupied", &state.current.is_some())
			.finish()
	}
}
