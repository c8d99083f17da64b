//! Core library for the shared-memory spectrum visualiser.
//!
//! A producer turns audio into magnitude frames and overwrites a
//! memory-mapped [`Channel`] with each one; consumers attach to the same
//! channel and draw the latest frame through the typed OpenGL wrappers in
//! [`graphics`].

pub mod analysis;
pub mod audio;
pub mod channel;
pub mod config;
pub mod consumer;
pub mod error;
pub mod graphics;
pub mod producer;
pub mod render;

pub use analysis::{SpectrumAnalyzer, WindowFunction};
pub use audio::{SampleSource, SineSource};
pub use channel::{default_base_path, Channel};
pub use config::{AppConfig, ChannelConfig, ProducerConfig, RendererConfig};
pub use consumer::{Consumer, FrameSummary, Monitor};
pub use error::{Result, ShmVizError};
pub use graphics::{Gl, NativeGl, RegistryConfig};
pub use producer::Producer;
pub use render::{SpectrumRenderer, Surface};
