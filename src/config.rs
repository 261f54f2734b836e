//! Application configuration and constants

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// === Model Files ===
pub const VISION_MODEL: &str = "mobilenet_v3_small.onnx";
pub const MODEL_ENV: &str = "ALBUMSIFT_MODEL";
pub const MODELS_DIR_ENV: &str = "ALBUMSIFT_MODELS_DIR";
pub const DEFAULT_INPUT_NAME: &str = "input";

// === Model Parameters ===
pub const INPUT_SIZE: u32 = 224;
pub const INTRA_THREADS: usize = 4;

// === Grouping / Matching Defaults ===
pub const DEFAULT_GROUP_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;
/// Threshold used by the training flow, looser than plain matching
pub const DEFAULT_ALBUM_THRESHOLD: f32 = 0.6;
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;
/// Fewer training photos than this give an unreliable album
pub const MIN_TRAINING_IMAGES: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_PREVIEW: usize = 5;

// === Storage ===
pub const STORE_DIR: &str = ".albumsift";
pub const STORE_EXT: &str = "msgpack";

// === File Extensions ===
pub const IMAGE_EXTENSIONS: &[&str] = &[
	"jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "ico", "avif",
];

/// Numeric range pixels are mapped into before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum PixelRange {
	/// 0..255 -> 0.0..1.0
	#[default]
	#[value(name = "0_1")]
	#[serde(rename = "0_1")]
	ZeroOne,
	/// 0..255 -> -1.0..1.0
	#[value(name = "-1_1")]
	#[serde(rename = "-1_1")]
	MinusOneOne,
}

impl PixelRange {
	pub fn map(self, channel: u8) -> f32 {
		match self {
			PixelRange::ZeroOne => channel as f32 / 255.0,
			PixelRange::MinusOneOne => channel as f32 / 127.5 - 1.0,
		}
	}
}

impl fmt::Display for PixelRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PixelRange::ZeroOne => write!(f, "0_1"),
			PixelRange::MinusOneOne => write!(f, "-1_1"),
		}
	}
}

impl FromStr for PixelRange {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"0_1" => Ok(PixelRange::ZeroOne),
			"-1_1" => Ok(PixelRange::MinusOneOne),
			other => Err(format!("unknown pixel range '{}', expected 0_1 or -1_1", other)),
		}
	}
}

/// How a non-square source is fitted into the square model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CropPolicy {
	/// Ignore aspect ratio
	Stretch,
	/// Keep aspect ratio, crop the centered region
	#[default]
	CenterCrop,
}

/// Memory layout of the model's input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TensorLayout {
	/// [1, H, W, 3]
	#[default]
	Nhwc,
	/// [1, 3, H, W]
	Nchw,
}

/// Preprocessing settings; embeddings are only comparable under equal configs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedConfig {
	pub input_size: u32,
	pub pixel_range: PixelRange,
	pub crop: CropPolicy,
	pub layout: TensorLayout,
}

impl Default for EmbedConfig {
	fn default() -> Self {
		Self {
			input_size: INPUT_SIZE,
			pixel_range: PixelRange::default(),
			crop: CropPolicy::default(),
			layout: TensorLayout::default(),
		}
	}
}

impl fmt::Display for EmbedConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}px, range {}, {:?}, {:?}",
			self.input_size, self.pixel_range, self.crop, self.layout
		)
	}
}

/// Get models directory (ALBUMSIFT_MODELS_DIR, or `models/` next to the executable)
pub fn models_dir() -> Option<PathBuf> {
	if let Ok(env_path) = std::env::var(MODELS_DIR_ENV) {
		let path = PathBuf::from(&env_path);
		if path.is_dir() {
			crate::ui::debug(&format!("Using {}: {}", MODELS_DIR_ENV, env_path));
			return Some(path);
		}
	}

	if let Ok(exe) = std::env::current_exe() {
		if let Some(dir) = exe.parent() {
			let models = dir.join("models");
			if models.is_dir() {
				crate::ui::debug(&format!("Found models at: {}", models.display()));
				return Some(models);
			}
		}
	}

	None
}

/// Resolve the vision model: explicit path, ALBUMSIFT_MODEL, then the models directory
pub fn resolve_model_path(explicit: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = explicit {
		return Some(path.to_path_buf());
	}
	if let Ok(env_path) = std::env::var(MODEL_ENV) {
		return Some(PathBuf::from(env_path));
	}
	models_dir().map(|d| d.join(VISION_MODEL))
}
