//! Cluster data structures for similarity grouping

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_GROUP_THRESHOLD, DEFAULT_MIN_CLUSTER_SIZE};
use crate::core::ImageRef;

/// Pairwise cosine similarities; symmetric with a unit diagonal
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix(Array2<f32>);

impl SimilarityMatrix {
	pub(crate) fn from_array(values: Array2<f32>) -> Self {
		Self(values)
	}

	pub fn len(&self) -> usize {
		self.0.nrows()
	}

	pub fn is_empty(&self) -> bool {
		self.0.nrows() == 0
	}

	pub fn get(&self, i: usize, j: usize) -> f32 {
		self.0[[i, j]]
	}
}

/// A group of visually similar images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
	/// Indices into the clustered candidate set, ascending
	pub members: Vec<usize>,
	pub member_refs: Vec<ImageRef>,
	/// Medoid index (highest mean similarity to the group)
	pub representative: usize,
	pub representative_ref: ImageRef,
	/// Average pairwise similarity within cluster
	pub cohesion: f32,
}

impl Cluster {
	pub fn size(&self) -> usize {
		self.members.len()
	}
}

/// Output of one clustering run
#[derive(Debug, Clone)]
pub struct Clustering {
	pub groups: Vec<Cluster>,
	pub similarity: SimilarityMatrix,
	/// Indices whose partition was smaller than the minimum size
	pub unclustered: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterParams {
	pub threshold: f32,
	pub min_cluster_size: usize,
}

impl Default for ClusterParams {
	fn default() -> Self {
		Self {
			threshold: DEFAULT_GROUP_THRESHOLD,
			min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
		}
	}
}

/// Serializable summary of a grouping run, for export
#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterReport {
	/// albumsift version that created this
	pub version: String,
	pub timestamp: String,
	pub params: ClusterParams,
	pub clusters: Vec<Cluster>,
	pub unclustered: Vec<ImageRef>,
	/// Images that produced an embedding
	pub total_images: usize,
	/// Images requested but skipped after a failure
	pub failed: usize,
}

impl ClusterReport {
	/// Summarize `clustering`, whose indices point into `refs`
	pub fn new(params: ClusterParams, clustering: Clustering, refs: &[ImageRef], failed: usize) -> Self {
		Self {
			version: env!("CARGO_PKG_VERSION").to_string(),
			timestamp: chrono::Utc::now().to_rfc3339(),
			params,
			unclustered: clustering.unclustered.iter().map(|&i| refs[i].clone()).collect(),
			clusters: clustering.groups,
			total_images: refs.len(),
			failed,
		}
	}

	pub fn unclustered_percent(&self) -> f32 {
		if self.total_images == 0 {
			0.0
		} else {
			(self.unclustered.len() as f32 / self.total_images as f32) * 100.0
		}
	}
}
