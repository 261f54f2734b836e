//! On-disk representatives, JSON exports and exclusion lists

pub mod exclusions;
pub mod export;
pub mod representative;

pub use exclusions::load_exclusions;
pub use export::{export_groups, export_matches, export_reindex, write_json};
pub use representative::{list, load, save, store_path, RepresentativeFile};
