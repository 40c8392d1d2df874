//! Perceptual hash producer for near-duplicate detection.
//!
//! Hashes are 64-bit fingerprints rendered as 16 hex digits. Two images
//! with the same fingerprint are treated as duplicates by the duplicate
//! rule; resolution happens there, not here.

use std::sync::Arc;

use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Schema, Value};
use crate::ledger::PATH_COLUMN;

use super::{Producer, Stage, StageOutput};

/// Which perceptual fingerprint to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// Mean-threshold hash over an 8x8 grayscale thumbnail.
    #[default]
    Average,
    /// Horizontal gradient hash (each bit compares adjacent pixels).
    Difference,
    /// Vertical gradient hash.
    VerticalDifference,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HashConfig {
    algorithm: HashAlgorithm,
}

/// Produces the `hash` column.
#[derive(Debug, Default)]
pub struct ImageHashProducer {
    algorithm: HashAlgorithm,
}

impl ImageHashProducer {
    pub const NAME: &'static str = "image_hash";

    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Producer>> {
        let config: HashConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("image_hash: {}", e)))?;
        Ok(Box::new(Self::new(config.algorithm)))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "algorithm": "average" })
    }
}

impl Producer for ImageHashProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produces(&self) -> Schema {
        Schema::new().with_field("hash", ColumnType::Str)
    }

    fn stages(&self) -> Vec<Stage> {
        let algorithm = self.algorithm;
        vec![Stage::new(vec![StageOutput::new(
            "hash",
            ColumnType::Str,
            &[PATH_COLUMN],
            Arc::new(move |view| {
                let path = view.path()?;
                let img = image::open(&path)
                    .map_err(|e| SluiceError::row(format!("decode '{}': {}", path, e)))?;
                Ok(Some(Value::Str(fingerprint(&img, algorithm))))
            }),
        )])]
    }
}

fn fingerprint(img: &DynamicImage, algorithm: HashAlgorithm) -> String {
    let bits = match algorithm {
        HashAlgorithm::Average => average_bits(img),
        HashAlgorithm::Difference => gradient_bits(img, 9, 8, false),
        HashAlgorithm::VerticalDifference => gradient_bits(img, 8, 9, true),
    };
    format!("{:016x}", bits)
}

fn average_bits(img: &DynamicImage) -> u64 {
    let thumb = img.resize_exact(8, 8, FilterType::Triangle).into_luma8();
    let sum: u32 = thumb.pixels().map(|p| p.0[0] as u32).sum();
    let mean = sum / 64;

    let mut bits = 0u64;
    for (i, pixel) in thumb.pixels().enumerate() {
        if pixel.0[0] as u32 > mean {
            bits |= 1 << i;
        }
    }
    bits
}

/// Each bit compares a pixel with its neighbor along one axis of a
/// downscaled grayscale thumbnail.
fn gradient_bits(img: &DynamicImage, width: u32, height: u32, vertical: bool) -> u64 {
    let thumb = img
        .resize_exact(width, height, FilterType::Triangle)
        .into_luma8();

    let mut bits = 0u64;
    let mut i = 0;
    if vertical {
        for x in 0..width {
            for y in 0..height - 1 {
                if thumb.get_pixel(x, y + 1).0[0] > thumb.get_pixel(x, y).0[0] {
                    bits |= 1 << i;
                }
                i += 1;
            }
        }
    } else {
        for y in 0..height {
            for x in 0..width - 1 {
                if thumb.get_pixel(x + 1, y).0[0] > thumb.get_pixel(x, y).0[0] {
                    bits |= 1 << i;
                }
                i += 1;
            }
        }
    }
    bits
}
