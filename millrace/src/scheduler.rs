//! Execute an action at a point in time, cancelably.
//!
//! Every scheduler provides two primitives, [`now`](`Scheduler::now`) and
//! [`schedule_at`](`Scheduler::schedule_at`), and inherits relative,
//! recursive and periodic scheduling from them. The concrete flavours
//! differ only in *where* and *when* dispatch happens: inline on the caller
//! ([`ImmediateScheduler`]), trampolined per calling thread
//! ([`CurrentThreadScheduler`]), one worker thread per action
//! ([`NewThreadScheduler`]), one shared worker loop
//! ([`EventLoopScheduler`]), or under explicit virtual-time control
//! ([`TestScheduler`]).

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use crate::subscription::{CompositeSubscription, ReplaceableSubscription, Subscription};

mod action;
mod clock;
mod current_thread;
mod event_loop;
mod immediate;
mod new_thread;
mod testing;
mod timed_queue;

pub use action::DiscardableAction;
pub use current_thread::CurrentThreadScheduler;
pub use event_loop::EventLoopScheduler;
pub use immediate::ImmediateScheduler;
pub use new_thread::NewThreadScheduler;
pub use testing::TestScheduler;

/// A strategy for executing actions at points in time, cancelably.
///
/// # Logic
///
/// Within one scheduler instance, actions run in `(due time, submission
/// order)` order: distinct due times run in time order, equal due times run
/// first-submitted-first. Across instances nothing is promised.
///
/// An action's return value is a [`Subscription`] over its in-flight work.
/// Every scheduling operation itself returns a [`Subscription`];
/// cancelling it
///
/// 1. prevents an action that has not yet started from ever running,
/// 2. cancels the subscription an already-dispatched action returned, and
/// 3. is idempotent and safe from any thread.
pub trait Scheduler: 'static + Clone + Send + Sync {
	/// This scheduler's reading of its clock.
	///
	/// Real schedulers share one process-wide monotonic epoch, so their
	/// readings are mutually comparable. The virtual scheduler counts from
	/// zero under test control and never consults the wall clock.
	fn now(&self) -> Duration;

	/// Schedules `action` to run once the clock reads at least `due`.
	fn schedule_at(
		&self,
		due: Duration,
		action: impl 'static + Send + FnOnce() -> Subscription,
	) -> Subscription;

	/// Schedules `action` as due immediately.
	fn schedule(&self, action: impl 'static + Send + FnOnce() -> Subscription) -> Subscription {
		self.schedule_at(self.now(), action)
	}

	/// Schedules `action` to run `delay` from now.
	fn schedule_after(
		&self,
		delay: Duration,
		action: impl 'static + Send + FnOnce() -> Subscription,
	) -> Subscription {
		self.schedule_at(self.now() + delay, action)
	}

	/// Schedules `cont`, handing it a [`Rescheduler`] through which it can
	/// schedule itself again.
	///
	/// At most one instance of the continuation is pending at a time: each
	/// reschedule replaces (and thereby cancels) the previous pending one.
	/// Cancelling the returned subscription halts the recursion within one
	/// step: a pending continuation is cancelled outright, and a running
	/// one finds its [`Rescheduler`] inert.
	fn schedule_recursive(
		&self,
		cont: impl 'static + Send + Sync + Fn(&Rescheduler<Self>) -> Subscription,
	) -> Subscription
	where
		Self: Sized,
	{
		let state = Arc::new(RecursiveState {
			scheduler: self.clone(),
			parent: CompositeSubscription::new(),
			child: ReplaceableSubscription::new(),
			cont: Box::new(cont),
		});
		state.parent.add(state.child.to_subscription());
		let first = self.schedule({
			let state = Arc::clone(&state);
			move || {
				let again = Rescheduler { state };
				(again.state.cont)(&again)
			}
		});
		state.parent.add(first);
		state.parent.to_subscription()
	}

	/// Schedules `action` to run after `initial_delay`, then every `period`.
	///
	/// Each period is measured from the *start* of the iteration it
	/// follows, so a transient overrun makes the next iteration due
	/// immediately without compounding; iterations are never doubled to
	/// catch up. Cancelling the returned subscription cancels the pending
	/// iteration and prevents all future ones.
	fn schedule_periodic(
		&self,
		initial_delay: Duration,
		period: Duration,
		action: impl 'static + Send + Sync + Fn(),
	) -> Subscription
	where
		Self: Sized,
	{
		let state = Arc::new(PeriodicState {
			scheduler: self.clone(),
			stopped: AtomicBool::new(false),
			slot: ReplaceableSubscription::new(),
			period,
			action: Box::new(action),
		});
		let handle = CompositeSubscription::new();
		// The stop flag must fall before the slot so that an iteration
		// racing the cancel can't reschedule into a just-emptied slot.
		handle.add(Subscription::new({
			let state = Arc::clone(&state);
			move || state.stopped.store(true, Ordering::SeqCst)
		}));
		handle.add(state.slot.to_subscription());
		let first = self.schedule_after(initial_delay, {
			let state = Arc::clone(&state);
			move || PeriodicState::tick(&state)
		});
		handle.add(first);
		handle.to_subscription()
	}
}

/// Handle through which a [`Scheduler::schedule_recursive`] continuation
/// schedules itself again.
pub struct Rescheduler<S: Scheduler> {
	state: Arc<RecursiveState<S>>,
}

struct RecursiveState<S: Scheduler> {
	scheduler: S,
	parent: CompositeSubscription,
	child: ReplaceableSubscription,
	cont: Box<dyn 'static + Send + Sync + Fn(&Rescheduler<S>) -> Subscription>,
}

impl<S: Scheduler> Rescheduler<S> {
	/// Schedules the continuation again, due immediately.
	///
	/// A no-op once the recursion's subscription has been cancelled.
	pub fn again(&self) {
		self.again_at(self.state.scheduler.now());
	}

	/// Schedules the continuation again, due `delay` from now.
	pub fn again_after(&self, delay: Duration) {
		self.again_at(self.state.scheduler.now() + delay);
	}

	/// Schedules the continuation again, due at `due`.
	pub fn again_at(&self, due: Duration) {
		if self.state.parent.is_cancelled() {
			return;
		}
		let next = self.state.scheduler.schedule_at(due, {
			let state = Arc::clone(&self.state);
			move || {
				let again = Rescheduler { state };
				(again.state.cont)(&again)
			}
		});
		self.state.child.replace(next);
	}
}

struct PeriodicState<S: Scheduler> {
	scheduler: S,
	stopped: AtomicBool,
	slot: ReplaceableSubscription,
	period: Duration,
	action: Box<dyn 'static + Send + Sync + Fn()>,
}

impl<S: Scheduler> PeriodicState<S> {
	fn tick(this: &Arc<Self>) -> Subscription {
		if this.stopped.load(Ordering::SeqCst) {
			return Subscription::empty();
		}
		let started_at = this.scheduler.now();
		(this.action)();
		if this.stopped.load(Ordering::SeqCst) {
			return Subscription::empty();
		}
		let elapsed = this.scheduler.now().saturating_sub(started_at);
		let delay = this.period.saturating_sub(elapsed);
		let next = this.scheduler.schedule_after(delay, {
			let this = Arc::clone(this);
			move || Self::tick(&this)
		});
		this.slot.replace(next);
		Subscription::empty()
	}
}
