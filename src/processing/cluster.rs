//! Threshold clustering over a pairwise similarity matrix

use ndarray::Array2;
use rayon::prelude::*;

use crate::core::embedding::{check_dims, dot};
use crate::core::{Cluster, ClusterParams, Clustering, Embedding, ImageRef, SimilarityMatrix};
use crate::error::{EngineError, Result};
use crate::ui;

/// Union-find over `0..n` with path halving and union by rank
#[derive(Debug, Clone)]
pub struct DisjointSet {
	parent: Vec<usize>,
	rank: Vec<u8>,
}

impl DisjointSet {
	pub fn new(n: usize) -> Self {
		Self {
			parent: (0..n).collect(),
			rank: vec![0; n],
		}
	}

	pub fn len(&self) -> usize {
		self.parent.len()
	}

	pub fn is_empty(&self) -> bool {
		self.parent.is_empty()
	}

	pub fn find(&mut self, mut x: usize) -> usize {
		while self.parent[x] != x {
			self.parent[x] = self.parent[self.parent[x]];
			x = self.parent[x];
		}
		x
	}

	/// Merge the sets of `a` and `b`; false if they were already joined
	pub fn union(&mut self, a: usize, b: usize) -> bool {
		let (ra, rb) = (self.find(a), self.find(b));
		if ra == rb {
			return false;
		}

		match self.rank[ra].cmp(&self.rank[rb]) {
			std::cmp::Ordering::Less => self.parent[ra] = rb,
			std::cmp::Ordering::Greater => self.parent[rb] = ra,
			std::cmp::Ordering::Equal => {
				self.parent[rb] = ra;
				self.rank[ra] += 1;
			}
		}
		true
	}

	/// Partitions ordered by their lowest member, members ascending
	pub fn groups(&mut self) -> Vec<Vec<usize>> {
		let n = self.len();
		let mut slot_of_root = vec![usize::MAX; n];
		let mut groups: Vec<Vec<usize>> = Vec::new();

		for i in 0..n {
			let root = self.find(i);
			if slot_of_root[root] == usize::MAX {
				slot_of_root[root] = groups.len();
				groups.push(Vec::new());
			}
			groups[slot_of_root[root]].push(i);
		}

		groups
	}
}

/// Full N×N cosine similarity matrix of unit-normalized embeddings
pub fn similarity_matrix(embeddings: &[Embedding]) -> SimilarityMatrix {
	let n = embeddings.len();

	// upper triangle, one row per task; each pair computed exactly once
	let upper: Vec<Vec<f32>> = (0..n)
		.into_par_iter()
		.map(|i| {
			let a = embeddings[i].as_slice();
			((i + 1)..n)
				.map(|j| dot(a, embeddings[j].as_slice()))
				.collect()
		})
		.collect();

	let mut sims = Array2::<f32>::zeros((n, n));
	for (i, row) in upper.iter().enumerate() {
		sims[[i, i]] = 1.0;
		for (offset, &s) in row.iter().enumerate() {
			let j = i + 1 + offset;
			sims[[i, j]] = s;
			sims[[j, i]] = s;
		}
	}

	SimilarityMatrix::from_array(sims)
}

/// Group `embeddings` whose similarity chains reach `params.threshold`
///
/// `refs[i]` identifies `embeddings[i]`. Groups smaller than
/// `params.min_cluster_size` are dropped and their members listed as
/// unclustered.
pub fn cluster(
	refs: &[ImageRef],
	embeddings: &[Embedding],
	params: &ClusterParams,
) -> Result<Clustering> {
	if refs.len() != embeddings.len() {
		return Err(EngineError::InvalidEmbeddingInput(format!(
			"{} references for {} embeddings",
			refs.len(),
			embeddings.len()
		)));
	}
	if let Some(first) = embeddings.first() {
		check_dims(embeddings, first.dim())?;
	}

	let n = embeddings.len();
	let similarity = similarity_matrix(embeddings);

	let mut dsu = DisjointSet::new(n);
	let mut merges = 0;
	for i in 0..n {
		for j in (i + 1)..n {
			if similarity.get(i, j) >= params.threshold && dsu.union(i, j) {
				merges += 1;
			}
		}
	}
	ui::debug(&format!(
		"Clustering {} embeddings at {:.2}: {} merges",
		n, params.threshold, merges
	));

	let mut groups = Vec::new();
	let mut unclustered = Vec::new();

	for members in dsu.groups() {
		if members.len() < params.min_cluster_size {
			unclustered.extend(members);
			continue;
		}

		let representative = pick_medoid(&members, &similarity);
		let cohesion = compute_cohesion(&members, &similarity);

		groups.push(Cluster {
			member_refs: members.iter().map(|&i| refs[i].clone()).collect(),
			representative_ref: refs[representative].clone(),
			members,
			representative,
			cohesion,
		});
	}

	unclustered.sort_unstable();

	// Sort clusters by size (largest first), then by representative uri
	groups.sort_by(|a, b| {
		b.size()
			.cmp(&a.size())
			.then_with(|| a.representative_ref.uri.cmp(&b.representative_ref.uri))
	});

	Ok(Clustering {
		groups,
		similarity,
		unclustered,
	})
}

/// Member with the highest mean similarity to the group; first one wins ties
pub fn pick_medoid(members: &[usize], sims: &SimilarityMatrix) -> usize {
	let mut best_idx = members[0];
	let mut best_score = f32::NEG_INFINITY;

	for &i in members {
		let mean = members.iter().map(|&j| sims.get(i, j)).sum::<f32>() / members.len() as f32;
		if mean > best_score {
			best_score = mean;
			best_idx = i;
		}
	}

	best_idx
}

/// Compute average pairwise similarity within cluster
fn compute_cohesion(members: &[usize], sims: &SimilarityMatrix) -> f32 {
	if members.len() < 2 {
		return 1.0;
	}

	let mut total_similarity = 0.0;
	let mut count = 0;

	for (pos, &i) in members.iter().enumerate() {
		for &j in &members[pos + 1..] {
			total_similarity += sims.get(i, j);
			count += 1;
		}
	}

	total_similarity / count as f32
}
