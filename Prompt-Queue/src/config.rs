use imagegen_rs::{ImageSize, DEFAULT_GEMINI_MODEL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fewest images requested per prompt.
pub const MIN_IMAGES: u8 = 1;
/// Most images requested per prompt.
pub const MAX_IMAGES: u8 = 4;

/// Clamp a raw numeric image-count input into `[MIN_IMAGES, MAX_IMAGES]`.
///
/// NaN becomes [`MIN_IMAGES`]; everything else is rounded and clamped to
/// the nearest bound.
pub fn clamp_image_count(value: f64) -> u8 {
    if value.is_nan() {
        return MIN_IMAGES;
    }
    value.clamp(MIN_IMAGES as f64, MAX_IMAGES as f64).round() as u8
}

/// A named style fragment appended to every prompt in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylePreset {
    pub label: &'static str,
    pub value: &'static str,
}

pub const STYLE_PRESETS: [StylePreset; 9] = [
    StylePreset {
        label: "None (Raw Prompt)",
        value: "",
    },
    StylePreset {
        label: "Photorealistic (DSLR)",
        value: "photorealistic, 8k, highly detailed, shot on DSLR, realistic lighting, sharp focus",
    },
    StylePreset {
        label: "Vintage Illustration",
        value: "vintage hand-drawn illustration, retro style, ink and paper texture, nostalgic aesthetic",
    },
    StylePreset {
        label: "Oil Painting",
        value: "oil painting style, textured canvas, impasto brushstrokes, classical art",
    },
    StylePreset {
        label: "Cinematic",
        value: "cinematic lighting, movie scene, dramatic atmosphere, 4k, anamorphic lens",
    },
    StylePreset {
        label: "Anime/Manga",
        value: "anime style, vibrant colors, studio ghibli inspired, 2D cel shaded",
    },
    StylePreset {
        label: "3D Render",
        value: "3D render, blender, octane render, unreal engine 5, ray tracing",
    },
    StylePreset {
        label: "Digital Art",
        value: "digital art, concept art, trending on artstation, clean lines",
    },
    StylePreset {
        label: "Watercolor",
        value: "watercolor painting, soft edges, artistic, bleeding colors, wet-on-wet",
    },
];

/// Look up a built-in style preset by its label.
pub fn style_preset_by_label(label: &str) -> Option<&'static StylePreset> {
    STYLE_PRESETS
        .iter()
        .find(|p| p.label.eq_ignore_ascii_case(label.trim()))
}

/// Generation parameters shared by every prompt in one batch.
///
/// Serializable so the last-used settings can be remembered in a
/// [`LocalStore`](crate::LocalStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    /// Aspect ratio or pixel size, depending on the backend in use.
    pub size: ImageSize,
    /// Images per prompt. Clamped on use, see [`image_count()`](Self::image_count).
    pub number_of_images: u8,
    /// Appended as `"<prompt>, <style>"` when non-blank.
    #[serde(default)]
    pub style_preset: Option<String>,
    pub model: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            number_of_images: MIN_IMAGES,
            style_preset: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// The image count, always within `[MIN_IMAGES, MAX_IMAGES]`.
    pub fn image_count(&self) -> u8 {
        self.number_of_images.clamp(MIN_IMAGES, MAX_IMAGES)
    }

    /// The style preset, or `None` if it is unset or blank.
    pub fn style_preset(&self) -> Option<&str> {
        self.style_preset
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.config.size = size;
        self
    }

    /// Set the image count, clamped into range.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.config.number_of_images = clamp_image_count(count as f64);
        self
    }

    /// Set the image count from a raw numeric input (e.g. a form field),
    /// which may be NaN or out of range.
    pub fn with_image_count_input(mut self, value: f64) -> Self {
        self.config.number_of_images = clamp_image_count(value);
        self
    }

    pub fn with_style_preset(mut self, style: impl Into<String>) -> Self {
        self.config.style_preset = Some(style.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn build(self) -> BatchConfig {
        self.config
    }
}

/// Configuration for the [`QueueProcessor`](crate::QueueProcessor).
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Delay between consecutive requests. Not applied after the last prompt.
    pub pacing: Duration,

    /// Capacity of the event broadcast channel. Slow subscribers that fall
    /// further behind than this miss events (snapshots are unaffected).
    pub event_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(1000),
            event_capacity: 256,
        }
    }
}

impl ProcessorConfig {
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }
}

/// Builder for [`ProcessorConfig`].
#[derive(Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Set the delay between consecutive requests.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.config.pacing = pacing;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}
