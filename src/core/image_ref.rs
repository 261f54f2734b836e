//! References to externally owned images

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::IMAGE_EXTENSIONS;
use crate::core::FileHash;

/// Opaque id plus a locatable byte source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
	pub id: String,
	pub uri: String,
}

impl ImageRef {
	pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			uri: uri.into(),
		}
	}

	/// Reference a file on disk, identified by its canonical path
	pub fn from_path(path: &Path) -> std::io::Result<Self> {
		let hash = FileHash::compute(path)?;
		Ok(Self {
			id: hash.into_string(),
			uri: path.to_string_lossy().into_owned(),
		})
	}

	/// Last path component of the uri, for display
	pub fn file_name(&self) -> &str {
		self.uri
			.rsplit(['/', '\\'])
			.next()
			.filter(|s| !s.is_empty())
			.unwrap_or(&self.uri)
	}
}

/// Detect supported images from file extension
pub fn is_image(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
