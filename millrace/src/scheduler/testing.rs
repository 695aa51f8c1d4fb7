use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
	time::Duration,
};

use parking_lot::Mutex;

use crate::subscription::Subscription;

use super::{action::DiscardableAction, timed_queue::TimedQueue, Scheduler};

/// Virtual-time scheduler for deterministic tests.
///
/// [`now`](`Scheduler::now`) reads a virtual clock that starts at zero and
/// only moves under explicit control; scheduling merely enqueues. Actions
/// run in `(due, submission)` order when one of the drive functions below
/// is called, each seeing the clock at its own due time. Repeated runs of
/// the same program therefore produce identical execution orders.
///
/// Scheduling into the virtual past is allowed. Such entries run at the
/// clock's current reading, which never moves backwards.
#[derive(Clone, Default)]
pub struct TestScheduler {
	state: Arc<Mutex<VirtualState>>,
}

#[derive(Default)]
struct VirtualState {
	queue: TimedQueue,
	now: Duration,
}

impl TestScheduler {
	/// A fresh scheduler at virtual time zero with an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the virtual clock to `due`, running every entry due at or
	/// before it, including entries those entries schedule.
	///
	/// # Panics
	///
	/// Panics if `due` is before the current virtual time.
	pub fn advance_to(&self, due: Duration) {
		assert!(
			due >= self.state.lock().now,
			"Tried to advance virtual time backwards."
		);
		loop {
			let entry = {
				let mut state = self.state.lock();
				match state.queue.pop_due(due) {
					Some(entry) => {
						state.now = state.now.max(entry.due);
						Some(entry)
					}
					None => {
						state.now = due;
						None
					}
				}
			};
			match entry {
				Some(entry) => entry.action.invoke(),
				None => return,
			}
		}
	}

	/// Advances the virtual clock by `delta`; see
	/// [`advance_to`](`TestScheduler::advance_to`).
	pub fn advance_by(&self, delta: Duration) {
		let due = self.state.lock().now + delta;
		self.advance_to(due);
	}

	/// Runs every entry due at or before the current virtual time, without
	/// advancing it further.
	pub fn trigger_actions(&self) {
		let due = self.state.lock().now;
		self.advance_to(due);
	}

	/// Runs the queue dry, advancing the clock to each entry's due time.
	pub fn run(&self) {
		loop {
			let entry = {
				let mut state = self.state.lock();
				let entry = state.queue.pop();
				if let Some(entry) = &entry {
					state.now = state.now.max(entry.due);
				}
				entry
			};
			match entry {
				Some(entry) => entry.action.invoke(),
				None => return,
			}
		}
	}

	/// Advances the virtual clock by `delta` without running anything.
	pub fn sleep(&self, delta: Duration) {
		self.state.lock().now += delta;
	}
}

impl Debug for TestScheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("TestScheduler")
			.field("now", &self.state.lock().now)
			.finish_non_exhaustive()
	}
}

impl Scheduler for TestScheduler {
	fn now(&self) -> Duration {
		self.state.lock().now
	}

	fn schedule_at(
		&self,
		due: Duration,
		action: impl 'static + Send + FnOnce() -> Subscription,
	) -> Subscription {
		let scheduled = DiscardableAction::new(action);
		let handle = scheduled.handle();
		self.state.lock().queue.push(due, scheduled);
		handle
	}
}
