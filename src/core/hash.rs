//! Location-based file ids

use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

/// Stable asset id derived from a file's canonical path
///
/// Every file gets its own id, so byte-identical copies stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHash(String);

impl FileHash {
	/// Hash the canonical form of `path`; fails if the file cannot be resolved
	pub fn compute(path: &Path) -> std::io::Result<Self> {
		let canonical = path.canonicalize()?;
		Ok(Self::of_key(&canonical.to_string_lossy()))
	}

	pub fn of_key(key: &str) -> Self {
		Self(format!("{:016x}", xxh3_64(key.as_bytes())))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl std::fmt::Display for FileHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn copies_get_distinct_ids() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.jpg"), b"same bytes").unwrap();
		fs::write(dir.path().join("b.jpg"), b"same bytes").unwrap();

		let a = FileHash::compute(&dir.path().join("a.jpg")).unwrap();
		let b = FileHash::compute(&dir.path().join("b.jpg")).unwrap();
		assert_ne!(a, b);
		assert_eq!(a.as_str().len(), 16);
	}

	#[test]
	fn same_file_by_any_path_has_one_id() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir(dir.path().join("sub")).unwrap();
		fs::write(dir.path().join("a.jpg"), b"x").unwrap();

		let direct = FileHash::compute(&dir.path().join("a.jpg")).unwrap();
		let roundabout = FileHash::compute(&dir.path().join("sub").join("..").join("a.jpg")).unwrap();
		assert_eq!(direct, roundabout);
	}

	#[test]
	fn missing_file_has_no_id() {
		assert!(FileHash::compute(Path::new("/definitely/not/here.jpg")).is_err());
	}
}
