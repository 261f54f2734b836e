//! Exclusion list files
//!
//! One entry per line: either an image id or a path to an image file,
//! relative to the list, which is resolved to its id. Blank lines and `#` comments are skipped.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::FileHash;
use crate::ui;

pub fn load_exclusions(path: &Path) -> Result<HashSet<String>> {
	if !path.exists() {
		ui::debug(&format!("No exclusion file at {}", path.display()));
		return Ok(HashSet::new());
	}

	let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
	let base = path.parent().unwrap_or(Path::new("."));
	let mut ids = HashSet::new();

	for line in BufReader::new(file).lines() {
		let line = line.context("Failed to read exclusion file")?;
		let entry = line.trim();
		if entry.is_empty() || entry.starts_with('#') {
			continue;
		}

		let candidate = base.join(entry);
		if candidate.is_file() {
			match FileHash::compute(&candidate) {
				Ok(hash) => {
					ids.insert(hash.into_string());
				}
				Err(e) => ui::warn(&format!("Cannot hash {}: {}", candidate.display(), e)),
			}
		} else {
			ids.insert(entry.to_string());
		}
	}

	Ok(ids)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn reads_ids_and_hashes_paths() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("skip.jpg"), b"pixels").unwrap();
		let list = dir.path().join("exclude.txt");
		fs::write(&list, "# done already\n\nabc123\n  skip.jpg  \n").unwrap();

		let ids = load_exclusions(&list).unwrap();
		assert_eq!(ids.len(), 2);
		assert!(ids.contains("abc123"));
		let skip = FileHash::compute(&dir.path().join("skip.jpg")).unwrap();
		assert!(ids.contains(skip.as_str()));
	}

	#[test]
	fn missing_file_excludes_nothing() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load_exclusions(&dir.path().join("none.txt")).unwrap().is_empty());
	}
}
