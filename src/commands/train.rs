//! Train command - learn an album representative from example photos

use std::path::Path;

use anyhow::Result;

use crate::cli::EmbedArgs;
use crate::config::MIN_TRAINING_IMAGES;
use crate::core::AbortFlag;
use crate::processing::create_representative;
use crate::runtime::Provider;
use crate::storage::{self, RepresentativeFile};
use crate::ui;

pub fn run(dir: &Path, name: &str, recursive: bool, embed: &EmbedArgs, provider: Provider) -> Result<()> {
	let images = super::collect_images(dir, recursive)?;
	if images.is_empty() {
		anyhow::bail!("No training images found in {}", dir.display());
	}
	if images.len() < MIN_TRAINING_IMAGES {
		ui::warn(&format!(
			"Only {} training images; at least {} give a reliable album",
			images.len(),
			MIN_TRAINING_IMAGES
		));
	}

	let extractor = super::extractor(embed, provider)?;
	let (representative, batch) =
		create_representative(&images, &extractor, &AbortFlag::new(), super::count_progress("Training"))?;
	let training_ids = batch.refs.into_iter().map(|r| r.id).collect();
	let file = RepresentativeFile::new(name, &representative, training_ids, extractor.config);

	let path = storage::save(&file, dir)?;
	ui::success(&format!(
		"Album '{}' learned from {} images ({}D)",
		name,
		file.training_count,
		representative.dim()
	));
	ui::info(&format!("Saved to {}", ui::path_link(&path, 60)));

	Ok(())
}
