use std::{
	fmt::{self, Debug, Formatter},
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{Arc, Weak},
	thread,
	time::Duration,
};

use event_listener::{Event, Listener as _};
use parking_lot::Mutex;

use crate::subscription::Subscription;

use super::{action::DiscardableAction, clock, timed_queue::TimedQueue, Scheduler};

/// Drives all of its actions on one shared worker thread.
///
/// Scheduling never waits on the loop: the worker parks until the earliest
/// entry is due (or until a new entry arrives) and runs actions one at a
/// time, in `(due, submission)` order. Clones share the loop. A panicking
/// action is caught on the worker, so the loop keeps serving the entries
/// behind it.
///
/// Dropping the last handle wakes and stops the worker; entries still
/// pending at that point are dropped unrun.
#[derive(Clone)]
pub struct EventLoopScheduler {
	shared: Arc<Shared>,
}

struct Shared {
	queue: Mutex<TimedQueue>,
	wakeup: Arc<Event>,
}

impl Drop for Shared {
	fn drop(&mut self) {
		// Unparks the worker so it can observe that every handle is gone.
		self.wakeup.notify(usize::MAX);
	}
}

enum Step {
	Ready(DiscardableAction),
	Until(Duration),
	Idle,
}

impl EventLoopScheduler {
	/// Starts the worker thread and returns a handle onto it.
	#[must_use]
	pub fn new() -> Self {
		let wakeup = Arc::new(Event::new());
		let shared = Arc::new(Shared {
			queue: Mutex::new(TimedQueue::new()),
			wakeup: Arc::clone(&wakeup),
		});
		let weak = Arc::downgrade(&shared);
		thread::Builder::new()
			.name("millrace-event-loop".to_owned())
			.spawn(move || Self::run(&weak, &wakeup))
			.expect("failed to spawn event loop thread");
		Self { shared }
	}

	fn run(shared: &Weak<Shared>, wakeup: &Event) {
		loop {
			let Some(strong) = shared.upgrade() else { return };

			// The listener is taken *before* the queue is inspected so a
			// submission between inspection and parking is never missed.
			let listener = wakeup.listen();
			let step = {
				let mut queue = strong.queue.lock();
				match queue.next_due() {
					Some(due) if due <= clock::monotonic_now() => queue
						.pop()
						.map_or(Step::Idle, |entry| Step::Ready(entry.action)),
					Some(due) => Step::Until(due),
					None => Step::Idle,
				}
			};
			// Parking must not keep the loop alive against handle drops.
			drop(strong);

			match step {
				Step::Ready(action) => {
					drop(listener);
					// A panicking action must not take the shared worker
					// down with it; later entries still get served.
					let _ = catch_unwind(AssertUnwindSafe(|| action.invoke()));
				}
				Step::Until(due) => {
					let _ = listener.wait_deadline(clock::instant_at(due));
				}
				Step::Idle => listener.wait(),
			}
		}
	}
}

impl Default for EventLoopScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Debug for EventLoopScheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventLoopScheduler").finish_non_exhaustive()
	}
}

impl Scheduler for EventLoopScheduler {
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
		self.shared.queue.lock().push(due, scheduled);
		self.shared.wakeup.notify(1);
		handle
	}
}
