use std::{thread, time::Duration};

use crate::subscription::Subscription;

use super::{action::DiscardableAction, clock, Scheduler};

/// Spawns one dedicated worker thread per scheduled action.
///
/// The worker sleeps until the action is due, then runs it. Cancelling the
/// returned subscription before the due time keeps the action from ever
/// running; the (detached) worker still wakes and exits on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewThreadScheduler;

impl NewThreadScheduler {
	/// The thread-per-action scheduler. All instances are interchangeable.
	pub fn new() -> Self {
		Self
	}
}

impl Scheduler for NewThreadScheduler {
	fn now(&self) -> Duration {
		clock::monotonic_now()
	}

	fn schedule_at(
		&self,
		due: Duration,
		action: impl 'static + Send + FnOnce() -> Subscription,
	) -> Subscription {
		let scheduled = DiscardableAction::new(action);
		let handle = scheduled.handle();
		thread::Builder::new()
			.name("millrace-worker".to_owned())
			.spawn(move || {
				clock::sleep_until(due);
				scheduled.invoke();
			})
			.expect("failed to spawn scheduler worker thread");
		handle
	}
}
