//! Reindex command - group and match a whole library chunk by chunk

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use colored::*;

use crate::cli::EmbedArgs;
use crate::core::{Cluster, ClusterParams};
use crate::processing::{ExclusionSource, Match, MatchTarget, ReindexPlan, Reindexer, ResultSink, RunStatus};
use crate::runtime::Provider;
use crate::storage;
use crate::ui;

pub struct ReindexOptions {
	pub chunk_size: usize,
	pub grouping: Option<ClusterParams>,
	/// Album name and the directory it was trained in
	pub album: Option<(String, PathBuf)>,
	pub match_threshold: f32,
	pub exclude_file: Option<PathBuf>,
	pub export: Option<PathBuf>,
}

/// Logs each chunk as it lands and keeps results for export
#[derive(Default)]
struct TerminalSink {
	groups: Vec<(usize, Cluster)>,
	matches: Vec<(usize, Match)>,
}

impl ResultSink for TerminalSink {
	fn on_groups(&mut self, chunk: usize, groups: &[Cluster]) -> Result<()> {
		let grouped: usize = groups.iter().map(|g| g.size()).sum();
		ui::debug(&format!(
			"Chunk {}: {} groups covering {} images",
			chunk + 1,
			groups.len(),
			grouped
		));
		self.groups.extend(groups.iter().cloned().map(|g| (chunk, g)));
		Ok(())
	}

	fn on_matches(&mut self, chunk: usize, matches: &[Match]) -> Result<()> {
		ui::debug(&format!("Chunk {}: {} album matches", chunk + 1, matches.len()));
		self.matches.extend(matches.iter().cloned().map(|m| (chunk, m)));
		Ok(())
	}
}

pub fn run(dir: &Path, recursive: bool, options: ReindexOptions, embed: &EmbedArgs, provider: Provider) -> Result<()> {
	let start = Instant::now();

	let matching = match &options.album {
		Some((name, from)) => {
			let album = storage::load(from, name)?;
			album.ensure_compatible(&embed.config())?;
			ui::info(&format!("Matching against album '{}'", name.bright_cyan()));
			Some(MatchTarget {
				representative: album.embedding(),
				threshold: options.match_threshold,
			})
		}
		None => None,
	};

	if options.grouping.is_none() && matching.is_none() {
		anyhow::bail!("Nothing to do: grouping is disabled and no --album was given");
	}

	let pool = super::collect_images(dir, recursive)?;
	if pool.is_empty() {
		ui::warn("No images found");
		return Ok(());
	}

	let plan = ReindexPlan {
		chunk_size: options.chunk_size,
		grouping: options.grouping,
		matching,
	};
	let reindexer = Reindexer::new(super::extractor(embed, provider)?, plan);

	let exclusions: Box<dyn ExclusionSource> = match options.exclude_file {
		Some(path) => Box::new(move || storage::load_exclusions(&path)),
		None => Box::new(HashSet::<String>::new()),
	};

	let mut sink = TerminalSink::default();
	let Some(report) = reindexer.reindex_all(&pool, exclusions.as_ref(), &mut sink, super::fraction_progress("Reindexing")) else {
		ui::warn("Reindex already running");
		return Ok(());
	};

	match &report.status {
		RunStatus::Completed => ui::success(&format!(
			"Reindexed {} images in {} chunks: {} groups, {} album matches",
			report.processed, report.chunks, report.groups, report.matched
		)),
		RunStatus::Aborted => ui::warn(&format!("Reindex stopped after {} chunks", report.chunks)),
		RunStatus::Error(message) => anyhow::bail!("Reindex failed: {}", message),
		RunStatus::Idle | RunStatus::Running => {}
	}
	if report.excluded > 0 {
		ui::info(&format!("{} images excluded", report.excluded));
	}
	if report.failed > 0 {
		ui::warn(&format!("{} images could not be processed", report.failed));
	}

	if let Some(export_path) = &options.export {
		storage::export_reindex(&report, &sink.groups, &sink.matches, export_path)?;
	}

	eprintln!(
		"\n{}",
		format!("Completed in {:.1}s", start.elapsed().as_secs_f32()).dimmed()
	);

	Ok(())
}
