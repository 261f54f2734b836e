//! Representative store format and I/O

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{EmbedConfig, STORE_DIR, STORE_EXT};
use crate::core::Embedding;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A learned album target, stored under `<dir>/.albumsift/<name>.msgpack`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeFile {
	version: String,
	pub name: String,
	pub created: String,
	pub training_count: usize,
	/// Ids of the images the representative was learned from
	pub training_ids: Vec<String>,
	pub config: EmbedConfig,
	embedding: Vec<f32>,
}

impl RepresentativeFile {
	pub fn new(name: &str, representative: &Embedding, training_ids: Vec<String>, config: EmbedConfig) -> Self {
		Self {
			version: VERSION.to_string(),
			name: name.to_string(),
			created: chrono::Utc::now().to_rfc3339(),
			training_count: training_ids.len(),
			training_ids,
			config,
			embedding: representative.as_slice().to_vec(),
		}
	}

	pub fn embedding(&self) -> Embedding {
		Embedding::raw(self.embedding.clone())
	}

	pub fn is_current_version(&self) -> bool {
		self.version == VERSION
	}

	/// Scores are only meaningful when candidates are preprocessed the same way
	pub fn ensure_compatible(&self, config: &EmbedConfig) -> Result<()> {
		if self.config != *config {
			bail!(
				"Album '{}' was trained with [{}] but the current settings are [{}]",
				self.name,
				self.config,
				config
			);
		}
		Ok(())
	}
}

fn validate_name(name: &str) -> Result<()> {
	if name.is_empty()
		|| name.starts_with('.')
		|| name.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
	{
		bail!("Invalid album name: '{}'", name);
	}
	Ok(())
}

pub fn store_path(dir: &Path, name: &str) -> PathBuf {
	dir.join(STORE_DIR).join(format!("{}.{}", name, STORE_EXT))
}

/// Save a representative into `dir`'s store, returning the written path
pub fn save(file: &RepresentativeFile, dir: &Path) -> Result<PathBuf> {
	validate_name(&file.name)?;
	let path = store_path(dir, &file.name);

	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).context("Failed to create .albumsift directory")?;
	}

	let bytes = rmp_serde::to_vec(file).context("Failed to serialize representative")?;
	fs::write(&path, bytes).context("Failed to write representative")?;

	Ok(path)
}

/// Load the album `name` from `dir`'s store
pub fn load(dir: &Path, name: &str) -> Result<RepresentativeFile> {
	validate_name(name)?;
	let path = store_path(dir, name);
	if !path.exists() {
		let known = list(dir);
		if known.is_empty() {
			bail!("No album '{}' in {}. Run 'albumsift train' first", name, dir.display());
		}
		bail!("No album '{}' in {}. Known albums: {}", name, dir.display(), known.join(", "));
	}

	let bytes = fs::read(&path).context("Failed to read representative")?;
	let file: RepresentativeFile =
		rmp_serde::from_slice(&bytes).context("Failed to deserialize representative")?;

	if !file.is_current_version() {
		crate::ui::debug(&format!(
			"Album '{}' was saved by version {}",
			file.name, file.version
		));
	}
	Ok(file)
}

/// Album names stored in `dir`, sorted
pub fn list(dir: &Path) -> Vec<String> {
	let Ok(entries) = fs::read_dir(dir.join(STORE_DIR)) else {
		return Vec::new();
	};

	let mut names: Vec<String> = entries
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.is_file() && p.extension().is_some_and(|x| x == STORE_EXT))
		.filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
		.collect();
	names.sort();
	names
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::PixelRange;

	#[test]
	fn save_then_load_keeps_vector_and_config() {
		let dir = tempfile::tempdir().unwrap();
		let rep = Embedding::new(vec![0.3, -0.1, 0.9]);
		let ids: Vec<String> = (0..12).map(|i| format!("id{}", i)).collect();
		let file = RepresentativeFile::new("beach", &rep, ids, EmbedConfig::default());

		let path = save(&file, dir.path()).unwrap();
		assert_eq!(path, dir.path().join(".albumsift").join("beach.msgpack"));

		let loaded = load(dir.path(), "beach").unwrap();
		assert_eq!(loaded.embedding(), rep);
		assert_eq!(loaded.training_count, 12);
		assert_eq!(loaded.training_ids[3], "id3");
		assert!(loaded.is_current_version());
		assert_eq!(list(dir.path()), vec!["beach".to_string()]);
	}

	#[test]
	fn config_mismatch_is_reported() {
		let rep = Embedding::new(vec![1.0, 0.0]);
		let file = RepresentativeFile::new("x", &rep, vec!["a".into()], EmbedConfig::default());
		let other = EmbedConfig {
			pixel_range: PixelRange::MinusOneOne,
			..EmbedConfig::default()
		};
		assert!(file.ensure_compatible(&EmbedConfig::default()).is_ok());
		assert!(file.ensure_compatible(&other).is_err());
	}

	#[test]
	fn missing_album_and_bad_names_fail() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load(dir.path(), "nope").is_err());
		assert!(load(dir.path(), "../etc").is_err());
		assert!(list(dir.path()).is_empty());
	}
}
