//! Representative-vector matching: learn one target from examples, then scan a pool

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_MATCH_THRESHOLD};
use crate::core::embedding::check_dims;
use crate::core::{AbortFlag, Embedding, ImageRef};
use crate::error::{EngineError, Result};
use crate::processing::extract::{EmbedBatch, Extractor};
use crate::processing::pool::run_queue;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchParams {
	pub threshold: f32,
	pub concurrency: usize,
}

impl Default for MatchParams {
	fn default() -> Self {
		Self {
			threshold: DEFAULT_MATCH_THRESHOLD,
			concurrency: DEFAULT_CONCURRENCY,
		}
	}
}

/// A candidate whose similarity to the representative reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
	pub image: ImageRef,
	pub score: f32,
}

/// Normalized mean of the training embeddings
pub fn build_representative(training: &[Embedding]) -> Result<Embedding> {
	let first = training.first().ok_or(EngineError::EmptyTrainingSet)?;
	check_dims(training, first.dim())?;
	Embedding::mean(training)
}

/// Embed the training images and average them into a representative
///
/// Training images that fail are skipped with a warning. The batch comes back
/// alongside so callers can record which images were learned from.
pub fn create_representative<P>(
	training: &[ImageRef],
	extractor: &Extractor,
	abort: &AbortFlag,
	on_progress: P,
) -> Result<(Embedding, EmbedBatch)>
where
	P: FnMut(usize, usize),
{
	if training.is_empty() {
		return Err(EngineError::EmptyTrainingSet);
	}

	let batch = extractor.embed_many(training, abort, on_progress)?;
	if batch.is_partial() {
		ui::warn(&format!(
			"Could only process {}/{} training images",
			batch.len(),
			batch.requested
		));
	}

	let representative = build_representative(&batch.embeddings)?;
	Ok((representative, batch))
}

/// Embed every candidate and keep those scoring at least `params.threshold`
///
/// Matches come back in completion order. Per-item failures are logged and
/// skipped; an observed abort ends the scan with `EngineError::Aborted`.
pub fn find_matches<P>(
	candidates: &[ImageRef],
	representative: &Embedding,
	extractor: &Extractor,
	params: &MatchParams,
	abort: &AbortFlag,
	on_progress: P,
) -> Result<Vec<Match>>
where
	P: FnMut(usize, usize),
{
	let run = run_queue(
		candidates,
		params.concurrency,
		abort,
		|image| {
			let embedding = extractor.embed(image)?;
			check_dims(std::slice::from_ref(&embedding), representative.dim())?;
			Ok(representative.similarity(&embedding))
		},
		on_progress,
	);

	if run.aborted {
		ui::debug(&format!(
			"Match scan aborted after {}/{} candidates",
			run.completed.len(),
			candidates.len()
		));
		return Err(EngineError::Aborted);
	}

	let mut matches = Vec::new();
	for (idx, outcome) in run.completed {
		let image = &candidates[idx];
		match outcome {
			Ok(score) if score >= params.threshold => matches.push(Match {
				image: image.clone(),
				score,
			}),
			Ok(_) => {}
			Err(e) if e.is_per_item() => ui::warn(&format!("Failed to process {}: {}", image.file_name(), e)),
			Err(e) => return Err(e),
		}
	}

	ui::debug(&format!(
		"{} of {} candidates matched at {:.2}",
		matches.len(),
		candidates.len(),
		params.threshold
	));

	Ok(matches)
}

/// Match already-extracted embeddings against the representative
///
/// `refs[i]` identifies `embeddings[i]`; input order is kept.
pub fn score_embeddings(
	refs: &[ImageRef],
	embeddings: &[Embedding],
	representative: &Embedding,
	threshold: f32,
) -> Result<Vec<Match>> {
	if refs.len() != embeddings.len() {
		return Err(EngineError::InvalidEmbeddingInput(format!(
			"{} references for {} embeddings",
			refs.len(),
			embeddings.len()
		)));
	}
	check_dims(embeddings, representative.dim())?;

	Ok(refs
		.iter()
		.zip(embeddings)
		.filter_map(|(image, embedding)| {
			let score = representative.similarity(embedding);
			(score >= threshold).then(|| Match {
				image: image.clone(),
				score,
			})
		})
		.collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_training_set_reproduces_embedding() {
		let e = Embedding::new(vec![0.2, -0.5, 0.7, 0.1]);
		let training = vec![e.clone(); 10];
		let rep = build_representative(&training).unwrap();
		for (a, b) in rep.as_slice().iter().zip(e.as_slice()) {
			assert!((a - b).abs() < 1e-6);
		}
	}

	#[test]
	fn representative_is_idempotent_and_unit() {
		let training: Vec<Embedding> = (0..6)
			.map(|i| Embedding::new(vec![1.0, i as f32, (i * i) as f32 * 0.1]))
			.collect();
		let a = build_representative(&training).unwrap();
		let b = build_representative(&training).unwrap();
		assert_eq!(a, b);
		assert!((a.norm() - 1.0).abs() < 1e-5);
	}

	#[test]
	fn empty_training_set_fails() {
		assert!(matches!(
			build_representative(&[]),
			Err(EngineError::EmptyTrainingSet)
		));
	}

	#[test]
	fn scores_keep_only_matches_at_threshold() {
		let rep = Embedding::raw(vec![1.0, 0.0]);
		let refs: Vec<ImageRef> = (0..3).map(|i| ImageRef::new(i.to_string(), i.to_string())).collect();
		let embs = vec![
			Embedding::raw(vec![0.5, 0.866]),
			Embedding::raw(vec![0.81, 0.586]),
			Embedding::raw(vec![-1.0, 0.0]),
		];
		let matches = score_embeddings(&refs, &embs, &rep, 0.8).unwrap();
		assert_eq!(matches.len(), 1);
		assert_eq!(matches[0].image.id, "1");
		assert!((matches[0].score - 0.81).abs() < 1e-6);
	}
}
