//! Core domain types

pub mod cluster;
pub mod embedding;
pub mod hash;
pub mod image_ref;
pub mod progress;

pub use cluster::{Cluster, ClusterParams, ClusterReport, Clustering, SimilarityMatrix};
pub use embedding::Embedding;
pub use hash::FileHash;
pub use image_ref::ImageRef;
pub use progress::{AbortFlag, Progress};
