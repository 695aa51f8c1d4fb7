#![warn(clippy::pedantic)]
//! Push-based value streams with a strict observer contract.
//!
//! The [`observer`] module carries the notification protocol and the
//! adapters enforcing its contract; scheduling and cancellation come from
//! the `millrace` runtime and are re-exported here.

pub mod observer;
pub use observer::{
	Checked, ContractViolation, FnObserver, Fused, Observer, ObserverExt, Queued, Synchronized,
};

pub use millrace::{
	queue_lock::QueueLock,
	scheduler::{
		CurrentThreadScheduler, DiscardableAction, EventLoopScheduler, ImmediateScheduler,
		NewThreadScheduler, Rescheduler, Scheduler, TestScheduler,
	},
	subscription::{CompositeSubscription, ReplaceableSubscription, Subscription},
};
