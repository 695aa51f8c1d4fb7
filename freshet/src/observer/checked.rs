use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;
use unwind_safe::try_eval;

use super::Observer;

/// How a [`Checked`] observer was misused.
///
/// Both kinds are caller bugs, not stream errors: they are delivered as
/// panics, never through the observer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
	/// A notification arrived while another was still in progress.
	#[error("reentrancy detected")]
	Reentrancy,
	/// A notification arrived after a terminal one.
	#[error("observer already terminated")]
	AlreadyTerminated,
}

const IDLE: u8 = 0;
const BUSY: u8 = 1;
const DONE: u8 = 2;

/// Validates the observer contract on behalf of its delegate.
///
/// Notifications must be mutually excluded and nothing may follow a
/// terminal one. A violating call forces the state to terminated *first*,
/// so the broken observer cannot be reused, and then panics with the
/// [`ContractViolation`]'s message. Panics from the delegate itself
/// propagate to the caller after the state transition has been completed.
#[derive(Debug)]
pub struct Checked<O> {
	inner: O,
	state: AtomicU8,
}

impl<O> Checked<O> {
	/// Wraps `inner`.
	pub fn new(inner: O) -> Self {
		Self {
			inner,
			state: AtomicU8::new(IDLE),
		}
	}

	fn enter(&self) {
		if let Err(current) =
			self.state
				.compare_exchange(IDLE, BUSY, Ordering::SeqCst, Ordering::SeqCst)
		{
			let violation = if current == DONE {
				ContractViolation::AlreadyTerminated
			} else {
				ContractViolation::Reentrancy
			};
			self.state.store(DONE, Ordering::SeqCst);
			panic!("{violation}");
		}
	}

	fn exit(&self, terminal: bool) {
		if terminal {
			self.state.store(DONE, Ordering::SeqCst);
		} else {
			// Compare-exchange, not a store: a nested violation has already
			// moved the state to terminated, and that must stick.
			let _ = self
				.state
				.compare_exchange(BUSY, IDLE, Ordering::SeqCst, Ordering::SeqCst);
		}
	}
}

impl<O: Observer> Observer for Checked<O> {
	type Item = O::Item;
	type Err = O::Err;

	fn on_next(&self, item: Self::Item) {
		self.enter();
		try_eval(|| self.inner.on_next(item)).finally(|()| self.exit(false));
	}

	fn on_error(&self, error: Self::Err) {
		self.enter();
		try_eval(|| self.inner.on_error(error)).finally(|()| self.exit(true));
	}

	fn on_completed(&self) {
		self.enter();
		try_eval(|| self.inner.on_completed()).finally(|()| self.exit(true));
	}
}
