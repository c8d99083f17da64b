use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{channel, Result};

/// Top-level configuration shared by the producer and consumer binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelConfig,
    pub producer: ProducerConfig,
    pub renderer: RendererConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Where the frame channel lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub base_path: PathBuf,
    pub name: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_path: channel::default_base_path(),
            name: "fft".to_string(),
        }
    }
}

/// Parameters of the FFT producer. Consumers must agree on `window`, since it
/// fixes the frame geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Number of samples in the FFT window.
    pub window: usize,
    /// Number of samples read per FFT calculation.
    pub hop: usize,
    pub sample_rate: u32,
    pub window_function: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            window: 1024,
            hop: 512,
            sample_rate: 22_050,
            window_function: "blackman".to_string(),
        }
    }
}

impl ProducerConfig {
    /// Number of magnitudes in one frame.
    pub fn bins(&self) -> usize {
        self.window / 2 + 1
    }

    /// Size in bytes of one frame of little-endian `f32` magnitudes.
    pub fn frame_bytes(&self) -> usize {
        4 * self.bins()
    }

    pub fn latency_seconds(&self) -> f32 {
        self.window as f32 / (2.0 * self.sample_rate as f32)
    }

    pub fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.hop.max(1) as f32
    }
}

/// Colour and axis mapping used by the spectrum renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Exponent of intensity in the luminance calculation.
    pub intensity_exp: f32,
    /// Moves the position of the red end of the hue ramp.
    pub hue_exp: f32,
    /// Values below 1 expand the low end of the frequency axis.
    pub freq_exp: f32,
    /// Values below 1 expand lower intensities.
    pub y_exp: f32,
    pub min_clip: f32,
    pub max_clip: f32,
    /// Value represented at the top of the graph.
    pub top_val: f32,
    /// Range represented vertically in the graph.
    pub range: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            intensity_exp: 2.0,
            hue_exp: 0.66,
            freq_exp: 0.5,
            y_exp: 1.0,
            min_clip: -100.0,
            max_clip: 100.0,
            top_val: 0.0,
            range: 5.0,
        }
    }
}
