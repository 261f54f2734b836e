//! Vision backbone (ONNX) producing image feature vectors

use anyhow::{Context, Result};
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;

use crate::config::TensorLayout;
use crate::processing::preprocess::PixelBuffer;
use crate::runtime::Provider;

use super::EmbeddingModel;

pub struct OnnxModel {
	session: Mutex<Session>,
	input_name: String,
	layout: TensorLayout,
	name: String,
}

impl OnnxModel {
	pub fn load(
		model_path: &Path,
		input_name: &str,
		layout: TensorLayout,
		provider: Provider,
	) -> Result<Self> {
		let session = crate::runtime::create_session(model_path, provider)
			.context("Failed to load vision model")?;
		let name = model_path
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| "vision".to_string());

		Ok(Self {
			session: Mutex::new(session),
			input_name: input_name.to_string(),
			layout,
			name,
		})
	}
}

impl EmbeddingModel for OnnxModel {
	fn infer(&self, pixels: &PixelBuffer) -> Result<Vec<f32>> {
		let input = ort::value::Value::from_array(pixels.to_tensor(self.layout))?;

		let mut session = self
			.session
			.lock()
			.map_err(|e| anyhow::anyhow!("Session lock: {}", e))?;
		let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

		let (shape, data) = outputs[0]
			.try_extract_tensor::<f32>()
			.context("Feature extraction failed")?;
		let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();

		Ok(flatten_features(&dims, data))
	}

	fn name(&self) -> &str {
		&self.name
	}
}

/// Reduce a model output to one feature vector
///
/// Token outputs (`[1, n, d]`) are mean-pooled; everything else
/// (`[1, d]`, `[1, d, 1, 1]`) is taken as-is.
pub(crate) fn flatten_features(dims: &[usize], data: &[f32]) -> Vec<f32> {
	match dims {
		[1, n, dim] if *n > 0 => {
			let mut pooled = vec![0.0; *dim];
			for i in 0..*n {
				for j in 0..*dim {
					pooled[j] += data[i * dim + j];
				}
			}
			pooled.iter_mut().for_each(|v| *v /= *n as f32);
			pooled
		}
		_ => data.to_vec(),
	}
}
