//! Fixed-size worker pool over a pre-filled job queue
//!
//! Workers pull item indices from a channel and report each completion back to
//! the calling thread, which owns all progress accounting. The abort flag is
//! checked before every pull, so in-flight items finish but nothing new starts.

use std::sync::mpsc;
use std::thread;

use crate::core::{AbortFlag, Progress};
use crate::error::Result;

pub(crate) struct QueueRun<R> {
	/// `(item index, outcome)` in completion order
	pub completed: Vec<(usize, Result<R>)>,
	/// Stopped early because of the abort flag
	pub aborted: bool,
}

/// Run `work` over `items` on at most `concurrency` threads
///
/// `on_progress(done, total)` is invoked on the calling thread exactly once per
/// finished item, with `done` strictly increasing.
pub(crate) fn run_queue<T, R, W, P>(
	items: &[T],
	concurrency: usize,
	abort: &AbortFlag,
	work: W,
	mut on_progress: P,
) -> QueueRun<R>
where
	T: Sync,
	R: Send,
	W: Fn(&T) -> Result<R> + Sync,
	P: FnMut(usize, usize),
{
	let total = items.len();
	let mut completed = Vec::with_capacity(total);
	if total == 0 {
		return QueueRun {
			completed,
			aborted: false,
		};
	}

	let workers = concurrency.clamp(1, total);
	let (job_tx, job_rx) = crossbeam_channel::bounded::<usize>(total);
	for idx in 0..total {
		if job_tx.send(idx).is_err() {
			break;
		}
	}
	drop(job_tx);

	let (done_tx, done_rx) = mpsc::channel::<(usize, Result<R>)>();
	let mut progress = Progress::start(total);
	let work = &work;

	thread::scope(|scope| {
		for _ in 0..workers {
			let jobs = job_rx.clone();
			let done = done_tx.clone();
			scope.spawn(move || {
				while !abort.is_aborted() {
					let Ok(idx) = jobs.recv() else { break };
					let outcome = work(&items[idx]);
					if done.send((idx, outcome)).is_err() {
						break;
					}
				}
			});
		}
		drop(done_tx);

		for (idx, outcome) in done_rx.iter() {
			progress.complete_one();
			on_progress(progress.done, progress.total);
			completed.push((idx, outcome));
		}
	});

	let aborted = completed.len() < total && abort.is_aborted();
	QueueRun { completed, aborted }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::EngineError;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn every_item_completes_once() {
		let items: Vec<usize> = (0..50).collect();
		let mut seen = Vec::new();
		let run = run_queue(&items, 4, &AbortFlag::new(), |v| Ok(v * 2), |done, total| {
			assert_eq!(total, 50);
			seen.push(done);
		});

		assert!(!run.aborted);
		assert_eq!(seen, (1..=50).collect::<Vec<_>>());

		let mut indices: Vec<usize> = run.completed.iter().map(|(i, _)| *i).collect();
		indices.sort_unstable();
		assert_eq!(indices, items);
		for (idx, outcome) in &run.completed {
			assert_eq!(*outcome.as_ref().unwrap(), idx * 2);
		}
	}

	#[test]
	fn failures_are_reported_not_fatal() {
		let items: Vec<usize> = (0..10).collect();
		let run = run_queue(
			&items,
			3,
			&AbortFlag::new(),
			|v| {
				if v % 2 == 0 {
					Ok(*v)
				} else {
					Err(EngineError::Inference(format!("item {}", v)))
				}
			},
			|_, _| {},
		);
		assert_eq!(run.completed.len(), 10);
		assert_eq!(run.completed.iter().filter(|(_, r)| r.is_err()).count(), 5);
	}

	#[test]
	fn abort_stops_new_work() {
		let items: Vec<usize> = (0..100).collect();
		let abort = AbortFlag::new();
		let started = AtomicUsize::new(0);
		let run = run_queue(
			&items,
			2,
			&abort,
			|v| {
				started.fetch_add(1, Ordering::SeqCst);
				if *v == 4 {
					abort.abort();
				}
				// later items stay in flight until the abort lands
				while *v > 4 && !abort.is_aborted() {
					thread::sleep(std::time::Duration::from_millis(1));
				}
				Ok(*v)
			},
			|_, _| {},
		);

		// items 0..=4 plus at most one pulled by the other worker
		assert!(run.aborted);
		assert!(run.completed.len() >= 5);
		assert!(run.completed.len() <= 6);
		assert_eq!(started.load(Ordering::SeqCst), run.completed.len());
	}

	#[test]
	fn empty_queue_is_a_noop() {
		let items: Vec<u8> = Vec::new();
		let mut calls = 0;
		let run = run_queue(&items, 4, &AbortFlag::new(), |v| Ok(*v), |_, _| calls += 1);
		assert!(run.completed.is_empty());
		assert!(!run.aborted);
		assert_eq!(calls, 0);
	}
}
