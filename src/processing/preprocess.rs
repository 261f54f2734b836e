//! Image decoding and resizing into model input buffers

use std::borrow::Cow;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::config::{CropPolicy, EmbedConfig, PixelRange, TensorLayout};
use crate::error::{EngineError, Result};

/// Source region used for a center crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

/// Flat RGB buffer (row-major, HWC) of a square `size`x`size` image
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
	size: u32,
	data: Vec<f32>,
}

impl PixelBuffer {
	pub fn size(&self) -> u32 {
		self.size
	}

	pub fn as_slice(&self) -> &[f32] {
		&self.data
	}

	/// RGB values of pixel (x, y)
	pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
		let idx = ((y * self.size + x) * 3) as usize;
		[self.data[idx], self.data[idx + 1], self.data[idx + 2]]
	}

	/// Shape and data for a batch-of-one input tensor
	pub fn to_tensor(&self, layout: TensorLayout) -> (Vec<usize>, Vec<f32>) {
		let size = self.size as usize;
		match layout {
			TensorLayout::Nhwc => (vec![1, size, size, 3], self.data.clone()),
			TensorLayout::Nchw => {
				let plane = size * size;
				let mut out = vec![0.0f32; 3 * plane];
				for (idx, px) in self.data.chunks_exact(3).enumerate() {
					out[idx] = px[0];
					out[plane + idx] = px[1];
					out[2 * plane + idx] = px[2];
				}
				(vec![1, 3, size, size], out)
			}
		}
	}
}

/// Decode `bytes` and produce a `config.input_size` square buffer
pub fn preprocess_with(bytes: &[u8], config: &EmbedConfig) -> Result<PixelBuffer> {
	preprocess(bytes, config.input_size, config.pixel_range, config.crop)
}

/// Decode encoded image bytes, fit them into a `size`x`size` square and map pixels into `range`
pub fn preprocess(
	bytes: &[u8],
	size: u32,
	range: PixelRange,
	crop: CropPolicy,
) -> Result<PixelBuffer> {
	if size == 0 {
		return Err(EngineError::Surface { width: 0, height: 0 });
	}
	let img = image::load_from_memory(bytes)?;
	preprocess_image(&img, size, range, crop)
}

pub fn preprocess_image(
	img: &DynamicImage,
	size: u32,
	range: PixelRange,
	crop: CropPolicy,
) -> Result<PixelBuffer> {
	let (width, height) = img.dimensions();
	if size == 0 || width == 0 || height == 0 {
		return Err(EngineError::Surface { width: size, height: size });
	}

	let source = match crop {
		CropPolicy::Stretch => Cow::Borrowed(img),
		CropPolicy::CenterCrop => {
			let rect = center_crop_rect(width, height, size, size);
			Cow::Owned(img.crop_imm(rect.x, rect.y, rect.width, rect.height))
		}
	};

	let len = (size as usize)
		.checked_mul(size as usize)
		.and_then(|n| n.checked_mul(3))
		.ok_or(EngineError::Surface { width: size, height: size })?;
	let mut data = Vec::new();
	data.try_reserve_exact(len)
		.map_err(|_| EngineError::Surface { width: size, height: size })?;

	let rgb = source.resize_exact(size, size, FilterType::CatmullRom).to_rgb8();
	for px in rgb.pixels() {
		data.push(range.map(px[0]));
		data.push(range.map(px[1]));
		data.push(range.map(px[2]));
	}

	Ok(PixelBuffer { size, data })
}

/// Largest centered region of the source with the destination's aspect ratio
pub fn center_crop_rect(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> CropRect {
	let dst_aspect = dst_w as f64 / dst_h as f64;
	let src_aspect = src_w as f64 / src_h as f64;

	if src_aspect > dst_aspect {
		let width = ((src_h as f64 * dst_aspect).round() as u32).clamp(1, src_w);
		CropRect {
			x: (src_w - width) / 2,
			y: 0,
			width,
			height: src_h,
		}
	} else {
		let height = ((src_w as f64 / dst_aspect).round() as u32).clamp(1, src_h);
		CropRect {
			x: 0,
			y: (src_h - height) / 2,
			width: src_w,
			height,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{ImageFormat, Rgba, RgbaImage};
	use std::io::Cursor;

	fn encode(img: DynamicImage) -> Vec<u8> {
		let mut bytes = Vec::new();
		img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
		bytes
	}

	fn solid(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
		encode(DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color))))
	}

	#[test]
	fn crop_wide_source_horizontally() {
		let rect = center_crop_rect(400, 200, 224, 224);
		assert_eq!(rect, CropRect { x: 100, y: 0, width: 200, height: 200 });
	}

	#[test]
	fn crop_tall_source_vertically() {
		let rect = center_crop_rect(200, 400, 224, 224);
		assert_eq!(rect, CropRect { x: 0, y: 100, width: 200, height: 200 });
	}

	#[test]
	fn crop_square_source_is_identity() {
		let rect = center_crop_rect(300, 300, 224, 224);
		assert_eq!(rect, CropRect { x: 0, y: 0, width: 300, height: 300 });
	}

	#[test]
	fn crop_offsets_round_down() {
		let rect = center_crop_rect(3, 2, 1, 1);
		assert_eq!(rect, CropRect { x: 0, y: 0, width: 2, height: 2 });
	}

	#[test]
	fn output_is_square_rgb() {
		let bytes = solid(40, 10, [255, 0, 0, 128]);
		for crop in [CropPolicy::Stretch, CropPolicy::CenterCrop] {
			let buf = preprocess(&bytes, 16, PixelRange::ZeroOne, crop).unwrap();
			assert_eq!(buf.as_slice().len(), 16 * 16 * 3);
			let [r, g, b] = buf.pixel(7, 7);
			assert!((r - 1.0).abs() < 0.01);
			assert!(g.abs() < 0.01 && b.abs() < 0.01);
		}
	}

	#[test]
	fn minus_one_range_maps_black() {
		let bytes = solid(8, 8, [0, 0, 0, 255]);
		let buf = preprocess(&bytes, 4, PixelRange::MinusOneOne, CropPolicy::CenterCrop).unwrap();
		assert!(buf.as_slice().iter().all(|v| (v + 1.0).abs() < 0.01));
	}

	#[test]
	fn undecodable_bytes_fail() {
		let err = preprocess(b"definitely not an image", 8, PixelRange::ZeroOne, CropPolicy::Stretch)
			.unwrap_err();
		assert!(matches!(err, EngineError::Decode(_)));
	}

	#[test]
	fn zero_size_target_fails() {
		let bytes = solid(8, 8, [0, 0, 0, 255]);
		let err = preprocess(&bytes, 0, PixelRange::ZeroOne, CropPolicy::Stretch).unwrap_err();
		assert!(matches!(err, EngineError::Surface { .. }));
	}

	#[test]
	fn nchw_tensor_groups_channels() {
		let buf = PixelBuffer {
			size: 1,
			data: vec![0.1, 0.2, 0.3],
		};
		assert_eq!(buf.to_tensor(TensorLayout::Nchw), (vec![1, 3, 1, 1], vec![0.1, 0.2, 0.3]));

		let buf = PixelBuffer {
			size: 2,
			data: (0..12).map(|v| v as f32).collect(),
		};
		let (shape, data) = buf.to_tensor(TensorLayout::Nchw);
		assert_eq!(shape, vec![1, 3, 2, 2]);
		assert_eq!(&data[..4], &[0.0, 3.0, 6.0, 9.0]);
		assert_eq!(&data[4..8], &[1.0, 4.0, 7.0, 10.0]);
	}
}
