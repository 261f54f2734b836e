//! Engine error taxonomy
//!
//! Per-item failures (`Decode`, `Surface`, `Source`, `Inference`) are skipped by
//! batch operations; structural failures abort the whole operation. `Aborted`
//! is cancellation, not a failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Failed to decode image: {0}")]
	Decode(#[from] image::ImageError),

	#[error("Cannot allocate {width}x{height} render target")]
	Surface { width: u32, height: u32 },

	#[error("Failed to read {uri}: {message}")]
	Source { uri: String, message: String },

	#[error("Inference failed: {0}")]
	Inference(String),

	#[error("No embeddings produced from {requested} images")]
	NoEmbeddingsProduced { requested: usize },

	#[error("Training set is empty")]
	EmptyTrainingSet,

	#[error("Invalid embedding input: {0}")]
	InvalidEmbeddingInput(String),

	#[error("Result consumer failed: {0}")]
	Sink(String),

	#[error("Failed to load exclusion set: {0}")]
	Exclusions(String),

	#[error("Aborted")]
	Aborted,
}

impl EngineError {
	/// Cancellation is reported through the error channel but is not a failure
	pub fn is_aborted(&self) -> bool {
		matches!(self, EngineError::Aborted)
	}

	/// Failures that only affect one item of a batch
	pub fn is_per_item(&self) -> bool {
		matches!(
			self,
			EngineError::Decode(_)
				| EngineError::Surface { .. }
				| EngineError::Source { .. }
				| EngineError::Inference(_)
		)
	}
}
