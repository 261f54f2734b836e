//! Normalized embedding vectors for visual similarity

use crate::error::{EngineError, Result};

/// Added to the norm so all-zero vectors stay finite
pub const NORM_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
	/// Create normalized embedding from raw model output
	pub fn new(data: Vec<f32>) -> Self {
		Self(l2_normalize(&data))
	}

	/// Create from pre-normalized data (deserialization)
	pub fn raw(data: Vec<f32>) -> Self {
		Self(data)
	}

	/// Get raw vector
	pub fn as_slice(&self) -> &[f32] {
		&self.0
	}

	pub fn dim(&self) -> usize {
		self.0.len()
	}

	pub fn norm(&self) -> f32 {
		self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
	}

	/// Cosine similarity [-1.0, 1.0]
	pub fn similarity(&self, other: &Self) -> f32 {
		dot(&self.0, &other.0)
	}

	/// Elementwise mean of `embeddings`, normalized
	pub fn mean(embeddings: &[Embedding]) -> Result<Self> {
		let first = embeddings.first().ok_or(EngineError::EmptyTrainingSet)?;
		let dim = first.dim();
		check_dims(embeddings, dim)?;

		let mut sum = vec![0.0f32; dim];
		for emb in embeddings {
			for (acc, &val) in sum.iter_mut().zip(emb.0.iter()) {
				*acc += val;
			}
		}

		let n = embeddings.len() as f32;
		sum.iter_mut().for_each(|v| *v /= n);

		Ok(Self::new(sum))
	}
}

/// Scale `v` to unit length: `v[i] / (‖v‖₂ + ε)`
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
	let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt() + NORM_EPSILON;
	v.iter().map(|x| x / norm).collect()
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Every embedding must have exactly `dim` components
pub fn check_dims(embeddings: &[Embedding], dim: usize) -> Result<()> {
	match embeddings.iter().position(|e| e.dim() != dim) {
		Some(idx) => Err(EngineError::InvalidEmbeddingInput(format!(
			"embedding {} has {} dimensions, expected {}",
			idx,
			embeddings[idx].dim(),
			dim
		))),
		None => Ok(()),
	}
}
