// Shared fixtures: solid-color PNGs, an in-memory image source and a lookup model

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use albumsift::config::EmbedConfig;
use albumsift::core::{AbortFlag, ImageRef};
use albumsift::models::EmbeddingModel;
use albumsift::processing::preprocess::PixelBuffer;
use albumsift::processing::{Extractor, ImageSource};
use image::{ImageFormat, Rgb, RgbImage};

/// Encode an 8x8 PNG whose red channel is `red`
pub fn solid_png(red: u8) -> Vec<u8> {
	let img = RgbImage::from_pixel(8, 8, Rgb([red, 40, 90]));
	let mut bytes = Vec::new();
	img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
	bytes
}

/// Unit vector in the plane whose dot product with `[1, 0]` is `score`
pub fn scored(score: f32) -> Vec<f32> {
	vec![score, (1.0 - score * score).max(0.0).sqrt()]
}

/// Images keyed by uri
#[derive(Default)]
pub struct MemorySource {
	files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
	pub fn insert(&mut self, uri: &str, bytes: Vec<u8>) {
		self.files.insert(uri.to_string(), bytes);
	}
}

impl ImageSource for MemorySource {
	fn read(&self, image: &ImageRef) -> anyhow::Result<Vec<u8>> {
		self.files
			.get(&image.uri)
			.cloned()
			.ok_or_else(|| anyhow::anyhow!("no such image"))
	}
}

/// Hold inference for images whose red key is at least `from_key`
pub struct Gate {
	pub from_key: u8,
	pub open: Arc<AtomicBool>,
	pub abort: Option<AbortFlag>,
}

impl Gate {
	fn wait(&self) {
		let deadline = Instant::now() + Duration::from_secs(5);
		while Instant::now() < deadline {
			if self.open.load(Ordering::SeqCst) || self.abort.as_ref().is_some_and(|a| a.is_aborted()) {
				return;
			}
			thread::sleep(Duration::from_millis(2));
		}
	}
}

/// Maps an image's red channel to a fixed raw vector
#[derive(Default)]
pub struct LookupModel {
	vectors: HashMap<u8, Vec<f32>>,
	pub gate: Option<Gate>,
}

impl LookupModel {
	pub fn with(mut self, key: u8, vector: Vec<f32>) -> Self {
		self.vectors.insert(key, vector);
		self
	}
}

impl EmbeddingModel for LookupModel {
	fn infer(&self, pixels: &PixelBuffer) -> anyhow::Result<Vec<f32>> {
		let key = (pixels.pixel(0, 0)[0] * 255.0).round() as u8;
		if let Some(gate) = &self.gate {
			if key >= gate.from_key {
				gate.wait();
			}
		}
		self.vectors
			.get(&key)
			.cloned()
			.ok_or_else(|| anyhow::anyhow!("no vector for key {}", key))
	}

	fn name(&self) -> &str {
		"lookup"
	}
}

/// Fixture builder: every added image gets id `id<key>` and uri `img<key>.png`
#[derive(Default)]
pub struct Library {
	pub source: MemorySource,
	pub model: LookupModel,
	pub refs: Vec<ImageRef>,
}

impl Library {
	pub fn image(mut self, key: u8, vector: Vec<f32>) -> Self {
		let image = ImageRef::new(format!("id{}", key), format!("img{:03}.png", key));
		self.source.insert(&image.uri, solid_png(key));
		self.model = self.model.with(key, vector);
		self.refs.push(image);
		self
	}

	/// An entry whose bytes are not an image
	pub fn corrupt(mut self, name: &str) -> Self {
		let image = ImageRef::new(name, name);
		self.source.insert(name, b"definitely not a png".to_vec());
		self.refs.push(image);
		self
	}

	/// An entry the source cannot find
	pub fn missing(mut self, name: &str) -> Self {
		self.refs.push(ImageRef::new(name, name));
		self
	}

	pub fn gated(mut self, gate: Gate) -> Self {
		self.model.gate = Some(gate);
		self
	}

	pub fn extractor(self, concurrency: usize) -> (Extractor, Vec<ImageRef>) {
		let config = EmbedConfig {
			input_size: 16,
			..EmbedConfig::default()
		};
		let extractor = Extractor::new(Arc::new(self.source), Arc::new(self.model))
			.with_config(config)
			.with_concurrency(concurrency);
		(extractor, self.refs)
	}
}
