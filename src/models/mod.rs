//! # ONNX Model Management
//!
//! The `EmbeddingModel` seam plus the lazily loaded ONNX implementation.

pub mod manager;
pub mod vision;

use anyhow::Result;

use crate::processing::preprocess::PixelBuffer;

pub use manager::Models;
pub use vision::OnnxModel;

/// A feature extractor turning a preprocessed image into a raw vector
///
/// Implementations are shared between workers and must tolerate
/// concurrent `infer` calls.
pub trait EmbeddingModel: Send + Sync {
	fn infer(&self, pixels: &PixelBuffer) -> Result<Vec<f32>>;

	fn name(&self) -> &str {
		"model"
	}
}
