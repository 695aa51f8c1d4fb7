use std::{cell::RefCell, time::Duration};

use scopeguard::guard;

use crate::subscription::Subscription;

use super::{action::DiscardableAction, clock, timed_queue::TimedQueue, Scheduler};

thread_local! {
	static TRAMPOLINE: RefCell<Option<TimedQueue>> = const { RefCell::new(None) };
}

/// Trampoline scheduler: queues actions per calling thread.
///
/// The first call on an idle thread installs that thread's queue and drains
/// it (pop the earliest entry, sleep until it is due, run it) until the
/// queue is empty. Calls made *from inside* a running action
/// enqueue and return at once; the active drain picks them up. Recursive
/// scheduling is thereby flattened into a loop, bounding stack depth.
///
/// All instances are interchangeable; the queue belongs to the thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
	/// The calling thread's trampoline.
	pub fn new() -> Self {
		Self
	}

	/// Whether the calling thread is currently inside a drain, i.e.
	/// whether a new action would be deferred rather than run before this
	/// call returns.
	pub fn is_draining(&self) -> bool {
		TRAMPOLINE.with(|slot| slot.borrow().is_some())
	}
}

impl Scheduler for CurrentThreadScheduler {
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

		let became_drainer = TRAMPOLINE.with(|slot| {
			let mut slot = slot.borrow_mut();
			if let Some(queue) = &mut *slot {
				queue.push(due, scheduled);
				false
			} else {
				let mut queue = TimedQueue::new();
				queue.push(due, scheduled);
				*slot = Some(queue);
				true
			}
		});

		if became_drainer {
			// The slot must clear however the drain exits; a panicking
			// action would otherwise poison this thread's later work.
			let _reset = guard((), |()| TRAMPOLINE.with(|slot| *slot.borrow_mut() = None));
			loop {
				// The slot is released between entries so actions can
				// enqueue freely.
				let next = TRAMPOLINE.with(|slot| {
					slot.borrow_mut().as_mut().and_then(TimedQueue::pop)
				});
				let Some(entry) = next else { break };
				clock::sleep_until(entry.due);
				entry.action.invoke();
			}
		}

		handle
	}
}
