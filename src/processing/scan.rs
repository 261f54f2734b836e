//! Directory scanning for image files

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::STORE_DIR;
use crate::core::image_ref::is_image;
use crate::core::ImageRef;
use crate::ui;

pub struct ScanResult {
	/// Sorted by path
	pub images: Vec<ImageRef>,
	pub errors: Vec<String>,
}

/// Collect every image under `root`, one `ImageRef` per file
///
/// Links resolving to the same file are listed once; copies are kept.
pub fn scan_directory(root: &Path, recursive: bool) -> Result<ScanResult> {
	if !root.is_dir() {
		bail!("Not a directory: {}", root.display());
	}

	let walker = if recursive { WalkDir::new(root) } else { WalkDir::new(root).max_depth(1) };

	let mut seen = HashSet::new();
	let mut paths: Vec<PathBuf> = walker
		.into_iter()
		.filter_entry(|e| e.file_name() != STORE_DIR)
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file() && is_image(e.path()))
		.map(|e| e.path().canonicalize().unwrap_or_else(|_| e.path().to_path_buf()))
		.filter(|p| seen.insert(p.clone()))
		.collect();
	paths.sort();

	let hashed: Vec<(PathBuf, std::io::Result<ImageRef>)> = paths
		.into_par_iter()
		.map(|p| {
			let image = ImageRef::from_path(&p);
			(p, image)
		})
		.collect();

	let mut result = ScanResult {
		images: Vec::with_capacity(hashed.len()),
		errors: Vec::new(),
	};

	for (path, image) in hashed {
		match image {
			Ok(image) => result.images.push(image),
			Err(e) => result.errors.push(format!("{}: {}", path.display(), e)),
		}
	}

	ui::debug(&format!(
		"Scanned {}: {} images, {} errors",
		root.display(),
		result.images.len(),
		result.errors.len()
	));

	Ok(result)
}
