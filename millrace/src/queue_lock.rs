//! Cooperative mutual exclusion over a queue of deferred actions.

use std::{
	collections::VecDeque,
	fmt::{self, Debug, Formatter},
	mem,
};

use parking_lot::Mutex;
use scopeguard::{guard, ScopeGuard};

type Action = Box<dyn 'static + Send + FnOnce()>;

/// A FIFO queue of deferred actions behind a busy flag.
///
/// [`enqueue`](`QueueLock::enqueue`) never waits on other actions: if the
/// lock is idle, the calling thread becomes the drainer and runs queued
/// actions (its own first) until none remain; if it is busy, the action is
/// left for the active drainer. At most one action runs at any time, in
/// submission order. This holds for actions submitted from *inside* a
/// running action too, which are queued behind it rather than run
/// recursively.
#[derive(Default)]
pub struct QueueLock {
	state: Mutex<QueueLockState>,
}

#[derive(Default)]
struct QueueLockState {
	queue: VecDeque<Action>,
	busy: bool,
	retired: bool,
}

impl QueueLock {
	/// An idle, empty lock.
	pub fn new() -> Self {
		Self::default()
	}

	/// Submits `action`, draining the queue if no other thread is doing so.
	pub fn enqueue(&self, action: impl 'static + Send + FnOnce()) {
		{
			let mut state = self.state.lock();
			if state.retired {
				return;
			}
			state.queue.push_back(Box::new(action));
			if state.busy {
				return;
			}
			state.busy = true;
		}

		// This thread found the lock idle and now drains it. A panicking
		// action retires the lock so later submissions don't pick up a
		// half-processed queue.
		let this = guard(self, |this| this.retire());
		loop {
			let next = {
				let mut state = this.state.lock();
				match state.queue.pop_front() {
					Some(next) => next,
					None => {
						state.busy = false;
						break;
					}
				}
			};
			next();
		}
		let _ = ScopeGuard::into_inner(this);
	}

	/// Permanently stops the queue: pending actions are dropped and every
	/// future [`enqueue`](`QueueLock::enqueue`) is ignored.
	pub fn retire(&self) {
		let dropped = {
			let mut state = self.state.lock();
			state.retired = true;
			mem::take(&mut state.queue)
		};
		// Queued closures may run arbitrary drop code; not under the lock.
		drop(dropped);
	}

	/// Whether [`retire`](`QueueLock::retire`) has run.
	pub fn is_retired(&self) -> bool {
		self.state.lock().retired
	}
}

impl Debug for QueueLock {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("QueueLock")
			.field("busy", &state.busy)
			.field("retired", &state.retired)
			.field("pending", &state.queue.len())
			.finish()
	}
}
