//! Group command - cluster photos by visual similarity

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use colored::*;

use crate::cli::EmbedArgs;
use crate::core::{AbortFlag, ClusterParams, ClusterReport};
use crate::processing::cluster;
use crate::runtime::Provider;
use crate::storage;
use crate::ui;

#[allow(clippy::too_many_arguments)]
pub fn run(
	dir: &Path,
	recursive: bool,
	params: ClusterParams,
	preview_count: usize,
	export: Option<&Path>,
	embed: &EmbedArgs,
	provider: Provider,
) -> Result<()> {
	let start = Instant::now();

	ui::debug(&format!(
		"Starting grouping: dir={}, recursive={}, threshold={}, min_size={}",
		dir.display(),
		recursive,
		params.threshold,
		params.min_cluster_size
	));

	let images = super::collect_images(dir, recursive)?;
	if images.is_empty() {
		ui::warn("No images found");
		return Ok(());
	}

	let extractor = super::extractor(embed, provider)?;
	let batch = extractor.embed_many(&images, &AbortFlag::new(), super::count_progress("Embedding"))?;
	ui::success(&format!("Embedded {} images", batch.len()));
	if batch.is_partial() {
		ui::warn(&format!("{} images could not be processed", batch.failed.len()));
	}

	let clustering = cluster(&batch.refs, &batch.embeddings, &params)?;
	let report = ClusterReport::new(params, clustering, &batch.refs, batch.failed.len());

	if !report.clusters.is_empty() {
		let sizes: Vec<usize> = report.clusters.iter().map(|c| c.size()).collect();
		let avg_size = sizes.iter().sum::<usize>() as f32 / sizes.len() as f32;
		ui::debug(&format!(
			"Group sizes: min={}, max={}, avg={:.1}",
			sizes.iter().min().unwrap_or(&0),
			sizes.iter().max().unwrap_or(&0),
			avg_size
		));
	}

	if let Some(export_path) = export {
		return storage::export_groups(&report, export_path);
	}

	print_groups(&report, preview_count);
	eprintln!(
		"\n{}",
		format!("Completed in {:.1}s", start.elapsed().as_secs_f32()).dimmed()
	);

	Ok(())
}

fn print_groups(report: &ClusterReport, preview_count: usize) {
	ui::success(&format!(
		"{} groups, {} images, {} ungrouped ({:.1}%)",
		report.clusters.len(),
		report.total_images,
		report.unclustered.len(),
		report.unclustered_percent()
	));

	for (id, cluster) in report.clusters.iter().enumerate() {
		eprintln!(
			"\n{} {} ({} images, {:.1}% cohesion)",
			"Group".bright_white(),
			(id + 1).to_string().bright_cyan(),
			cluster.size(),
			cluster.cohesion * 100.0
		);

		eprintln!(
			"  {}: {}",
			"Representative".dimmed(),
			ui::path_link(Path::new(&cluster.representative_ref.uri), 60).bright_white()
		);

		for (i, image) in cluster.member_refs.iter().take(preview_count).enumerate() {
			eprintln!(
				"  {} {}",
				format!("[{}]", i + 1).dimmed(),
				ui::path_link(Path::new(&image.uri), 60)
			);
		}

		if cluster.size() > preview_count {
			eprintln!(
				"  {}",
				format!("... and {} more", cluster.size() - preview_count).dimmed()
			);
		}
	}
}
