//! # Command Implementations
//!
//! Each submodule handles one CLI command (group, train, find, reindex).

pub mod find;
pub mod group;
pub mod reindex;
pub mod train;

use anyhow::Result;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::cli::EmbedArgs;
use crate::core::{ImageRef, Progress};
use crate::models::{EmbeddingModel, Models};
use crate::processing::{self, Extractor, FsSource};
use crate::runtime::Provider;
use crate::ui;

/// Load the model once and wrap it with filesystem access and CLI settings
pub fn extractor(embed: &EmbedArgs, provider: Provider) -> Result<Extractor> {
	let models = Models::new(embed.model.as_deref(), &embed.input_name, embed.layout(), provider)?;
	ui::debug(&format!("Model: {}", models.vision_path().display()));

	let config = embed.config();
	ui::debug(&format!("Preprocessing: {}", config));

	let model = models.vision()?;
	ui::debug(&format!("Loaded model '{}'", model.name()));

	Ok(Extractor::new(Arc::new(FsSource), model)
		.with_config(config)
		.with_concurrency(embed.concurrency))
}

/// Scan `dir`, reporting unreadable files as warnings
pub fn collect_images(dir: &Path, recursive: bool) -> Result<Vec<ImageRef>> {
	ui::info(&format!("Scanning {}", ui::path_link(dir, 40)));
	let scan = processing::scan_directory(dir, recursive)?;
	for error in &scan.errors {
		ui::warn(error);
	}
	ui::debug(&format!("Found {} images", scan.images.len()));
	Ok(scan.images)
}

/// Redraws a progress bar on stderr for `(done, total)` updates
pub fn count_progress(label: &str) -> impl FnMut(usize, usize) + '_ {
	move |done, total| {
		draw_progress(label, Progress { done, total }.value());
	}
}

/// Redraws a progress bar on stderr for fractional updates
pub fn fraction_progress(label: &str) -> impl FnMut(f32) + '_ {
	move |value| draw_progress(label, value)
}

fn draw_progress(label: &str, value: f32) {
	if ui::Log::is_verbose() {
		return;
	}
	let mut stderr = std::io::stderr();
	let _ = write!(stderr, "\r{} {}", label, ui::progress_bar(value, 30));
	if value >= 1.0 {
		let _ = writeln!(stderr);
	}
	let _ = stderr.flush();
}
