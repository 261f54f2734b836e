//! Lazy model loading coordinator

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::{self, TensorLayout};
use crate::runtime::Provider;

use super::vision::OnnxModel;
use super::EmbeddingModel;

/// Owns the vision model location and loads it once on first use
///
/// Every caller receives a clone of the same `Arc` handle.
pub struct Models {
	vision: Mutex<Option<Arc<OnnxModel>>>,
	vision_path: PathBuf,
	input_name: String,
	layout: TensorLayout,
	provider: Provider,
}

impl Models {
	pub fn new(
		explicit_path: Option<&Path>,
		input_name: &str,
		layout: TensorLayout,
		provider: Provider,
	) -> Result<Self> {
		let vision_path = config::resolve_model_path(explicit_path).context(format!(
			"Vision model not found. Pass --model, set {} or place {} in a models/ directory",
			config::MODEL_ENV,
			config::VISION_MODEL
		))?;

		if !vision_path.exists() {
			anyhow::bail!(
				"Vision model file does not exist: {}",
				vision_path.display()
			);
		}

		Ok(Self {
			vision: Mutex::new(None),
			vision_path,
			input_name: input_name.to_string(),
			layout,
			provider,
		})
	}

	pub fn vision_path(&self) -> &Path {
		&self.vision_path
	}

	/// Shared vision model handle, loading it on first call
	pub fn vision(&self) -> Result<Arc<dyn EmbeddingModel>> {
		let mut slot = self
			.vision
			.lock()
			.map_err(|e| anyhow::anyhow!("Model lock: {}", e))?;

		if let Some(model) = slot.as_ref() {
			return Ok(model.clone());
		}

		crate::ui::debug(&format!(
			"Loading vision model: {}",
			self.vision_path.display()
		));
		let model = Arc::new(OnnxModel::load(
			&self.vision_path,
			&self.input_name,
			self.layout,
			self.provider,
		)?);
		crate::ui::success("Vision model loaded");

		*slot = Some(model.clone());
		Ok(model)
	}
}
