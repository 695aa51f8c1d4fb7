#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
//! millrace is the scheduling runtime framework backing `freshet`.
//!
//! It carries the cancellation primitives ([`subscription`]), cooperative
//! mutual exclusion ([`queue_lock`]) and the [`scheduler`] framework: two
//! primitives per scheduler (a clock reading and absolute-time scheduling)
//! from which relative, recursive and periodic scheduling are derived, plus
//! five concrete scheduler flavours including a deterministic virtual-time
//! one for tests.
//!
//! # Threading Notes
//!
//! Critical sections in this crate are brief by construction: no lock is
//! held while an external action or callback runs.

pub mod queue_lock;
pub mod scheduler;
pub mod subscription;
