use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ImageGenError;

/// Aspect ratios accepted by the Gemini and Imagen endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Landscape16x9,
    Portrait9x16,
    Landscape4x3,
    Portrait3x4,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s.trim())
    }

    /// Width divided by height.
    pub fn quotient(&self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Landscape16x9 => 16.0 / 9.0,
            AspectRatio::Portrait9x16 => 9.0 / 16.0,
            AspectRatio::Landscape4x3 => 4.0 / 3.0,
            AspectRatio::Portrait3x4 => 3.0 / 4.0,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested output size, expressed either as an aspect ratio or in pixels.
///
/// Gemini/Imagen want an aspect ratio while OpenAI-style endpoints want a
/// `WxH` pixel size. Each backend converts with [`aspect_ratio()`](Self::aspect_ratio)
/// or [`pixel_size()`](Self::pixel_size), so either form works with either backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    AspectRatio(AspectRatio),
    Pixels { width: u32, height: u32 },
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::AspectRatio(AspectRatio::Square)
    }
}

impl ImageSize {
    pub const fn pixels(width: u32, height: u32) -> Self {
        ImageSize::Pixels { width, height }
    }

    /// The aspect ratio for this size. Pixel sizes map to the closest ratio.
    pub fn aspect_ratio(&self) -> AspectRatio {
        match *self {
            ImageSize::AspectRatio(r) => r,
            ImageSize::Pixels { width, height } => {
                if width == 0 || height == 0 {
                    return AspectRatio::Square;
                }
                let q = width as f64 / height as f64;
                AspectRatio::ALL
                    .into_iter()
                    .min_by(|a, b| {
                        (a.quotient() - q)
                            .abs()
                            .total_cmp(&(b.quotient() - q).abs())
                    })
                    .unwrap_or(AspectRatio::Square)
            }
        }
    }

    /// The `(width, height)` for this size. Aspect ratios map onto the three
    /// sizes OpenAI-style endpoints accept.
    pub fn pixel_size(&self) -> (u32, u32) {
        match *self {
            ImageSize::Pixels { width, height } => (width, height),
            ImageSize::AspectRatio(AspectRatio::Square) => (1024, 1024),
            ImageSize::AspectRatio(AspectRatio::Landscape16x9 | AspectRatio::Landscape4x3) => {
                (1792, 1024)
            }
            ImageSize::AspectRatio(AspectRatio::Portrait9x16 | AspectRatio::Portrait3x4) => {
                (1024, 1792)
            }
        }
    }

    /// The pixel size formatted as `WxH`.
    pub fn pixel_size_string(&self) -> String {
        let (w, h) = self.pixel_size();
        format!("{}x{}", w, h)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSize::AspectRatio(r) => f.write_str(r.as_str()),
            ImageSize::Pixels { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

impl FromStr for ImageSize {
    type Err = ImageGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(ratio) = AspectRatio::parse(s) {
            return Ok(ImageSize::AspectRatio(ratio));
        }
        if let Some((w, h)) = s.split_once('x') {
            if let (Ok(width), Ok(height)) = (w.parse::<u32>(), h.parse::<u32>()) {
                if width > 0 && height > 0 {
                    return Ok(ImageSize::Pixels { width, height });
                }
            }
        }
        Err(ImageGenError::Other(format!("Unsupported image size: {}", s)))
    }
}

impl Serialize for ImageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single text-to-image request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
    /// Number of images to generate. Some models always return one.
    pub count: u8,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: ImageSize::default(),
            count: 1,
            model: model.into(),
            seed: None,
        }
    }

    pub fn size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A selectable model, as shown in a model picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub label: &'static str,
    pub value: &'static str,
}
