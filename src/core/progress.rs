//! Progress accounting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Completion counters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
	pub done: usize,
	pub total: usize,
}

impl Progress {
	pub fn start(total: usize) -> Self {
		Self { done: 0, total }
	}

	/// Fraction done in [0, 1]; an empty run counts as finished
	pub fn value(&self) -> f32 {
		if self.total == 0 {
			1.0
		} else {
			(self.done as f32 / self.total as f32).min(1.0)
		}
	}

	/// Record one completed item, saturating at `total`
	pub fn complete_one(&mut self) {
		if self.done < self.total {
			self.done += 1;
		}
	}
}

/// Shared abort switch, polled between work items
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn abort(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_aborted(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub fn clear(&self) {
		self.0.store(false, Ordering::SeqCst);
	}
}
