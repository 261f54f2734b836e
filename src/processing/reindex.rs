//! Chunked full-pool reindexing
//!
//! A `Reindexer` is the caller-owned session for long runs: it walks the
//! candidate pool in fixed-size chunks, groups and/or matches each chunk, and
//! hands results to a `ResultSink` as soon as a chunk is done.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::core::{AbortFlag, Cluster, ClusterParams, Embedding, ImageRef};
use crate::error::{EngineError, Result};
use crate::processing::cluster::cluster;
use crate::processing::extract::{EmbedBatch, Extractor};
use crate::processing::matcher::{find_matches, score_embeddings, Match, MatchParams};
use crate::ui;

/// Receives results chunk by chunk; delivered results are never rolled back
pub trait ResultSink {
	fn on_groups(&mut self, chunk: usize, groups: &[Cluster]) -> anyhow::Result<()>;
	fn on_matches(&mut self, chunk: usize, matches: &[Match]) -> anyhow::Result<()>;
}

/// Ids to skip; consulted again before every chunk
pub trait ExclusionSource {
	fn excluded(&self) -> anyhow::Result<HashSet<String>>;
}

impl ExclusionSource for HashSet<String> {
	fn excluded(&self) -> anyhow::Result<HashSet<String>> {
		Ok(self.clone())
	}
}

impl<F> ExclusionSource for F
where
	F: Fn() -> anyhow::Result<HashSet<String>>,
{
	fn excluded(&self) -> anyhow::Result<HashSet<String>> {
		self()
	}
}

/// Keeps every delivered result in memory
#[derive(Debug, Default)]
pub struct CollectSink {
	pub groups: Vec<(usize, Cluster)>,
	pub matches: Vec<(usize, Match)>,
}

impl ResultSink for CollectSink {
	fn on_groups(&mut self, chunk: usize, groups: &[Cluster]) -> anyhow::Result<()> {
		self.groups.extend(groups.iter().cloned().map(|g| (chunk, g)));
		Ok(())
	}

	fn on_matches(&mut self, chunk: usize, matches: &[Match]) -> anyhow::Result<()> {
		self.matches.extend(matches.iter().cloned().map(|m| (chunk, m)));
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum RunStatus {
	#[default]
	Idle,
	Running,
	Completed,
	Error(String),
	Aborted,
}

/// Target for the matching phase
#[derive(Debug, Clone)]
pub struct MatchTarget {
	pub representative: Embedding,
	pub threshold: f32,
}

#[derive(Debug, Clone)]
pub struct ReindexPlan {
	pub chunk_size: usize,
	/// Cluster each chunk
	pub grouping: Option<ClusterParams>,
	/// Match each chunk against a representative
	pub matching: Option<MatchTarget>,
}

impl Default for ReindexPlan {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_CHUNK_SIZE,
			grouping: Some(ClusterParams::default()),
			matching: None,
		}
	}
}

impl ReindexPlan {
	/// Share of a chunk's progress owned by the grouping and matching phases
	fn phase_weights(&self) -> (f32, f32) {
		match (self.grouping.is_some(), self.matching.is_some()) {
			(true, true) => (0.5, 0.5),
			(true, false) => (1.0, 0.0),
			(false, true) => (0.0, 1.0),
			(false, false) => (0.0, 0.0),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
	pub status: RunStatus,
	/// Chunks fully processed
	pub chunks: usize,
	/// Images handed to the engine
	pub processed: usize,
	/// Images skipped by the exclusion set
	pub excluded: usize,
	/// Images that failed to embed
	pub failed: usize,
	pub groups: usize,
	pub matched: usize,
}

/// Monotonic overall progress across chunks and phases
struct ProgressTracker<P: FnMut(f32)> {
	total: usize,
	last: f32,
	on_progress: P,
}

impl<P: FnMut(f32)> ProgressTracker<P> {
	fn new(total: usize, mut on_progress: P) -> Self {
		on_progress(0.0);
		Self {
			total,
			last: 0.0,
			on_progress,
		}
	}

	/// `fraction` of the chunk spanning `[base, base + len)` is done
	fn update(&mut self, base: usize, len: usize, fraction: f32) {
		let value = if self.total == 0 {
			1.0
		} else {
			(base as f32 + len as f32 * fraction.clamp(0.0, 1.0)) / self.total as f32
		};
		let value = value.clamp(0.0, 1.0);
		if value > self.last {
			self.last = value;
			(self.on_progress)(value);
		}
	}
}

pub struct Reindexer {
	extractor: Extractor,
	plan: ReindexPlan,
	status: Mutex<RunStatus>,
	abort: AbortFlag,
}

impl Reindexer {
	pub fn new(extractor: Extractor, plan: ReindexPlan) -> Self {
		Self {
			extractor,
			plan,
			status: Mutex::new(RunStatus::Idle),
			abort: AbortFlag::new(),
		}
	}

	pub fn status(&self) -> RunStatus {
		self.lock_status().clone()
	}

	/// Handle for aborting from another thread
	pub fn abort_flag(&self) -> AbortFlag {
		self.abort.clone()
	}

	/// Stop the active run, or the next one if none is active
	///
	/// The request stays pending until a run observes it or `reset()` clears it.
	pub fn abort(&self) {
		self.abort.abort();
	}

	/// Return a finished run to `Idle` and drop any pending abort; ignored while running
	pub fn reset(&self) -> bool {
		let mut status = self.lock_status();
		if *status == RunStatus::Running {
			return false;
		}
		self.abort.clear();
		*status = RunStatus::Idle;
		true
	}

	/// Process the whole pool chunk by chunk
	///
	/// Returns `None` without doing anything when a run is already active.
	/// Errors never escape: they end up in the returned report and in
	/// `status()` until `reset()`.
	pub fn reindex_all<P>(
		&self,
		pool: &[ImageRef],
		exclusions: &dyn ExclusionSource,
		sink: &mut dyn ResultSink,
		on_progress: P,
	) -> Option<RunReport>
	where
		P: FnMut(f32),
	{
		{
			let mut status = self.lock_status();
			if *status == RunStatus::Running {
				ui::debug("Reindex already running, ignoring start request");
				return None;
			}
			*status = RunStatus::Running;
		}

		let mut report = RunReport::default();
		let status = match self.run(pool, exclusions, sink, &mut report, on_progress) {
			Ok(()) => {
				ui::debug(&format!(
					"Reindex done: {} chunks, {} groups, {} matches",
					report.chunks, report.groups, report.matched
				));
				RunStatus::Completed
			}
			Err(e) if e.is_aborted() => {
				ui::debug(&format!("Reindex aborted after {} chunks", report.chunks));
				RunStatus::Aborted
			}
			Err(e) => {
				ui::error(&format!("Reindex failed: {}", e));
				RunStatus::Error(e.to_string())
			}
		};

		// A finished run consumes the abort request
		self.abort.clear();
		*self.lock_status() = status.clone();
		report.status = status;
		Some(report)
	}

	fn run<P>(
		&self,
		pool: &[ImageRef],
		exclusions: &dyn ExclusionSource,
		sink: &mut dyn ResultSink,
		report: &mut RunReport,
		on_progress: P,
	) -> Result<()>
	where
		P: FnMut(f32),
	{
		if self.abort.is_aborted() {
			return Err(EngineError::Aborted);
		}

		let excluded = load_exclusions(exclusions)?;
		let targets: Vec<ImageRef> = pool
			.iter()
			.filter(|image| !excluded.contains(&image.id))
			.cloned()
			.collect();
		report.excluded = pool.len() - targets.len();

		let total = targets.len();
		let mut tracker = ProgressTracker::new(total, on_progress);
		if total == 0 {
			ui::debug("Nothing to reindex");
			tracker.update(0, 0, 1.0);
			return Ok(());
		}

		let chunk_size = self.plan.chunk_size.max(1);
		let (group_weight, match_weight) = self.plan.phase_weights();
		ui::debug(&format!(
			"Reindexing {} images in chunks of {}",
			total, chunk_size
		));

		for (chunk_idx, chunk) in targets.chunks(chunk_size).enumerate() {
			if self.abort.is_aborted() {
				return Err(EngineError::Aborted);
			}

			let base = chunk_idx * chunk_size;
			let len = chunk.len();

			// External state may change during long runs
			let excluded = load_exclusions(exclusions)?;
			let work: Vec<ImageRef> = chunk
				.iter()
				.filter(|image| !excluded.contains(&image.id))
				.cloned()
				.collect();
			report.excluded += len - work.len();

			let mut embedded: Option<EmbedBatch> = None;
			if let Some(params) = &self.plan.grouping {
				embedded = self.embed_chunk(&work, chunk_idx, report, |done, n| {
					tracker.update(base, len, group_weight * done as f32 / n as f32)
				})?;

				if let Some(batch) = &embedded {
					let clustering = cluster(&batch.refs, &batch.embeddings, params)?;
					report.groups += clustering.groups.len();
					sink.on_groups(chunk_idx, &clustering.groups)
						.map_err(|e| EngineError::Sink(format!("{:#}", e)))?;
				}
			}

			if let Some(target) = &self.plan.matching {
				if self.abort.is_aborted() {
					return Err(EngineError::Aborted);
				}

				let matches = match &embedded {
					Some(batch) => score_embeddings(
						&batch.refs,
						&batch.embeddings,
						&target.representative,
						target.threshold,
					)?,
					None if self.plan.grouping.is_some() => Vec::new(),
					None => {
						let params = MatchParams {
							threshold: target.threshold,
							concurrency: self.extractor.concurrency,
						};
						find_matches(
							&work,
							&target.representative,
							&self.extractor,
							&params,
							&self.abort,
							|done, n| {
								tracker.update(
									base,
									len,
									group_weight + match_weight * done as f32 / n as f32,
								)
							},
						)?
					}
				};

				report.matched += matches.len();
				sink.on_matches(chunk_idx, &matches)
					.map_err(|e| EngineError::Sink(format!("{:#}", e)))?;
			}

			report.chunks += 1;
			report.processed += work.len();
			tracker.update(base, len, 1.0);
			ui::debug(&format!(
				"Chunk {} done ({}/{} images)",
				chunk_idx + 1,
				base + len,
				total
			));
		}

		Ok(())
	}

	/// Embed one chunk; a chunk where every image failed is skipped, not fatal
	fn embed_chunk<P>(
		&self,
		work: &[ImageRef],
		chunk_idx: usize,
		report: &mut RunReport,
		on_progress: P,
	) -> Result<Option<EmbedBatch>>
	where
		P: FnMut(usize, usize),
	{
		if work.is_empty() {
			return Ok(None);
		}

		match self.extractor.embed_many(work, &self.abort, on_progress) {
			Ok(batch) => {
				report.failed += batch.failed.len();
				Ok(Some(batch))
			}
			Err(EngineError::NoEmbeddingsProduced { requested }) => {
				ui::warn(&format!(
					"Chunk {}: none of {} images could be embedded",
					chunk_idx + 1,
					requested
				));
				report.failed += requested;
				Ok(None)
			}
			Err(e) => Err(e),
		}
	}

	fn lock_status(&self) -> MutexGuard<'_, RunStatus> {
		self.status.lock().unwrap_or_else(|e| e.into_inner())
	}
}

fn load_exclusions(exclusions: &dyn ExclusionSource) -> Result<HashSet<String>> {
	exclusions
		.excluded()
		.map_err(|e| EngineError::Exclusions(format!("{:#}", e)))
}
