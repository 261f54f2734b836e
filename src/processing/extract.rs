//! Embedding extraction, single and batched

use std::sync::Arc;

use anyhow::Context;

use crate::config::{EmbedConfig, DEFAULT_CONCURRENCY};
use crate::core::{AbortFlag, Embedding, ImageRef};
use crate::error::{EngineError, Result};
use crate::models::EmbeddingModel;
use crate::processing::pool::run_queue;
use crate::processing::preprocess::preprocess_with;
use crate::ui;

/// Supplies the encoded bytes behind an `ImageRef`
pub trait ImageSource: Send + Sync {
	fn read(&self, image: &ImageRef) -> anyhow::Result<Vec<u8>>;
}

/// Treats `ImageRef::uri` as a filesystem path
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl ImageSource for FsSource {
	fn read(&self, image: &ImageRef) -> anyhow::Result<Vec<u8>> {
		std::fs::read(&image.uri).with_context(|| format!("Failed to read {}", image.uri))
	}
}

/// Successful embeddings of a batch, in completion order
#[derive(Debug, Clone, Default)]
pub struct EmbedBatch {
	pub embeddings: Vec<Embedding>,
	/// `refs[i]` produced `embeddings[i]`
	pub refs: Vec<ImageRef>,
	/// Skipped items with the reason they failed
	pub failed: Vec<(ImageRef, String)>,
	pub requested: usize,
}

impl EmbedBatch {
	pub fn len(&self) -> usize {
		self.embeddings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.embeddings.is_empty()
	}

	/// Some requested images produced no embedding
	pub fn is_partial(&self) -> bool {
		self.embeddings.len() < self.requested
	}
}

/// Preprocess encoded bytes, run the model and normalize its output
pub fn embed_one(
	bytes: &[u8],
	model: &dyn EmbeddingModel,
	config: &EmbedConfig,
) -> Result<Embedding> {
	let pixels = preprocess_with(bytes, config)?;
	let raw = model
		.infer(&pixels)
		.map_err(|e| EngineError::Inference(format!("{:#}", e)))?;

	if raw.is_empty() {
		return Err(EngineError::Inference("model returned an empty vector".into()));
	}
	if raw.iter().any(|v| !v.is_finite()) {
		return Err(EngineError::Inference("model returned non-finite values".into()));
	}

	Ok(Embedding::new(raw))
}

/// Fetch, preprocess and embed one referenced image
pub fn embed_ref(
	image: &ImageRef,
	source: &dyn ImageSource,
	model: &dyn EmbeddingModel,
	config: &EmbedConfig,
) -> Result<Embedding> {
	let bytes = source.read(image).map_err(|e| EngineError::Source {
		uri: image.uri.clone(),
		message: format!("{:#}", e),
	})?;
	embed_one(&bytes, model, config)
}

/// Embed `refs` on a bounded worker pool
///
/// Individual failures are logged and skipped. Fails only when nothing
/// succeeded or the run was aborted.
pub fn embed_many<P>(
	refs: &[ImageRef],
	source: &dyn ImageSource,
	model: &dyn EmbeddingModel,
	config: &EmbedConfig,
	concurrency: usize,
	abort: &AbortFlag,
	on_progress: P,
) -> Result<EmbedBatch>
where
	P: FnMut(usize, usize),
{
	let run = run_queue(
		refs,
		concurrency,
		abort,
		|image| embed_ref(image, source, model, config),
		on_progress,
	);

	if run.aborted {
		ui::debug(&format!(
			"Embedding aborted after {}/{} images",
			run.completed.len(),
			refs.len()
		));
		return Err(EngineError::Aborted);
	}

	let mut batch = EmbedBatch {
		requested: refs.len(),
		..Default::default()
	};

	for (idx, outcome) in run.completed {
		let image = &refs[idx];
		match outcome {
			Ok(embedding) => {
				batch.embeddings.push(embedding);
				batch.refs.push(image.clone());
			}
			Err(e) => {
				ui::warn(&format!("Skipping {}: {}", image.file_name(), e));
				batch.failed.push((image.clone(), e.to_string()));
			}
		}
	}

	if batch.is_empty() && !refs.is_empty() {
		return Err(EngineError::NoEmbeddingsProduced {
			requested: refs.len(),
		});
	}

	if batch.is_partial() {
		ui::debug(&format!(
			"Embedded {}/{} images ({} failed)",
			batch.len(),
			batch.requested,
			batch.failed.len()
		));
	}

	Ok(batch)
}

/// Image source, shared model handle and preprocessing settings for one run
#[derive(Clone)]
pub struct Extractor {
	pub source: Arc<dyn ImageSource>,
	pub model: Arc<dyn EmbeddingModel>,
	pub config: EmbedConfig,
	pub concurrency: usize,
}

impl Extractor {
	pub fn new(source: Arc<dyn ImageSource>, model: Arc<dyn EmbeddingModel>) -> Self {
		Self {
			source,
			model,
			config: EmbedConfig::default(),
			concurrency: DEFAULT_CONCURRENCY,
		}
	}

	pub fn with_config(mut self, config: EmbedConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency.max(1);
		self
	}

	pub fn embed(&self, image: &ImageRef) -> Result<Embedding> {
		embed_ref(image, self.source.as_ref(), self.model.as_ref(), &self.config)
	}

	pub fn embed_many<P>(&self, refs: &[ImageRef], abort: &AbortFlag, on_progress: P) -> Result<EmbedBatch>
	where
		P: FnMut(usize, usize),
	{
		embed_many(
			refs,
			self.source.as_ref(),
			self.model.as_ref(),
			&self.config,
			self.concurrency,
			abort,
			on_progress,
		)
	}
}
