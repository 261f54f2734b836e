//! Embedding, grouping and matching pipelines

pub mod cluster;
pub mod extract;
pub mod matcher;
pub(crate) mod pool;
pub mod preprocess;
pub mod reindex;
pub mod scan;

pub use cluster::{cluster, similarity_matrix, DisjointSet};
pub use extract::{embed_many, embed_one, EmbedBatch, Extractor, FsSource, ImageSource};
pub use matcher::{build_representative, create_representative, find_matches, score_embeddings, Match, MatchParams};
pub use preprocess::{center_crop_rect, preprocess, CropRect, PixelBuffer};
pub use reindex::{
	CollectSink, ExclusionSource, MatchTarget, ReindexPlan, Reindexer, ResultSink, RunReport, RunStatus,
};
pub use scan::{scan_directory, ScanResult};
