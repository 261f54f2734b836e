//! Find command - scan a directory for photos matching a trained album

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use colored::*;

use crate::cli::EmbedArgs;
use crate::core::{AbortFlag, ImageRef};
use crate::processing::{find_matches, MatchParams};
use crate::runtime::Provider;
use crate::storage;
use crate::ui;

pub struct FindOptions {
	pub name: String,
	/// Directory the album was trained in, if not the searched one
	pub from: Option<PathBuf>,
	pub threshold: f32,
	pub limit: usize,
	/// Keep the album's own training photos among the candidates
	pub include_training: bool,
	pub exclude_file: Option<PathBuf>,
	pub export: Option<PathBuf>,
}

/// Remove training photos (unless kept) and excluded ids before matching
///
/// Returns the remaining candidates and how many were removed.
fn search_pool(
	candidates: Vec<ImageRef>,
	training_ids: &[String],
	include_training: bool,
	excluded: &HashSet<String>,
) -> (Vec<ImageRef>, usize) {
	let training: HashSet<&str> = if include_training {
		HashSet::new()
	} else {
		training_ids.iter().map(String::as_str).collect()
	};

	let before = candidates.len();
	let pool: Vec<ImageRef> = candidates
		.into_iter()
		.filter(|c| !training.contains(c.id.as_str()) && !excluded.contains(&c.id))
		.collect();
	let removed = before - pool.len();
	(pool, removed)
}

pub fn run(dir: &Path, recursive: bool, options: FindOptions, embed: &EmbedArgs, provider: Provider) -> Result<()> {
	let start = Instant::now();
	let name = options.name.as_str();
	let threshold = options.threshold;
	let limit = options.limit;

	let album = storage::load(options.from.as_deref().unwrap_or(dir), name)?;
	let config = embed.config();
	album.ensure_compatible(&config)?;
	ui::debug(&format!(
		"Album '{}': {} training images, created {}",
		album.name, album.training_count, album.created
	));

	let excluded = match &options.exclude_file {
		Some(path) => storage::load_exclusions(path)?,
		None => HashSet::new(),
	};
	let (candidates, removed) = search_pool(
		super::collect_images(dir, recursive)?,
		&album.training_ids,
		options.include_training,
		&excluded,
	);
	if removed > 0 {
		ui::info(&format!("Skipping {} training or excluded images", removed));
	}
	if candidates.is_empty() {
		ui::warn("No candidate images found");
		return Ok(());
	}

	let extractor = super::extractor(embed, provider)?;
	let params = MatchParams {
		threshold,
		concurrency: extractor.concurrency,
	};

	let mut matches = find_matches(
		&candidates,
		&album.embedding(),
		&extractor,
		&params,
		&AbortFlag::new(),
		super::count_progress("Matching"),
	)?;
	matches.sort_by(|a, b| {
		b.score
			.partial_cmp(&a.score)
			.unwrap_or(Ordering::Equal)
			.then_with(|| a.image.uri.cmp(&b.image.uri))
	});

	if let Some(export_path) = options.export.as_deref() {
		return storage::export_matches(name, threshold, candidates.len(), &matches, export_path);
	}

	ui::success(&format!(
		"{} of {} images match '{}' at {:.2}",
		matches.len(),
		candidates.len(),
		name,
		threshold
	));

	if !matches.is_empty() {
		ui::header(&format!("Best matches for '{}'", name));
	}
	for m in matches.iter().take(limit) {
		eprintln!(
			"  {} {}",
			format!("{:.3}", m.score).bright_cyan(),
			ui::path_link(Path::new(&m.image.uri), 60)
		);
	}
	if matches.len() > limit {
		eprintln!(
			"  {}",
			format!("... and {} more", matches.len() - limit).dimmed()
		);
	}

	eprintln!(
		"\n{}",
		format!("Completed in {:.1}s", start.elapsed().as_secs_f32()).dimmed()
	);

	Ok(())
}
