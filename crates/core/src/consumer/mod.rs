//! Consumer side of the channel: the render loop and a headless monitor.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    channel::Channel,
    render::{SpectrumRenderer, Surface},
    Result, ShmVizError,
};

const PROGRESS_INTERVAL: u64 = 600;

fn float_count(channel: &Channel) -> Result<usize> {
    if channel.len() % 4 != 0 {
        return Err(ShmVizError::SizeMismatch {
            path: channel.path().to_path_buf(),
            expected: channel.len() / 4 * 4,
            actual: channel.len(),
        });
    }
    Ok(channel.len() / 4)
}

/// Reads the latest frame each iteration and draws it.
///
/// Frames are read without coordination with the producer, so a frame drawn
/// here may be torn.
#[derive(Debug)]
pub struct Consumer<'g> {
    channel: Channel,
    renderer: SpectrumRenderer<'g>,
    frame: Vec<f32>,
    frames: u64,
}

impl<'g> Consumer<'g> {
    pub fn new(channel: Channel, renderer: SpectrumRenderer<'g>) -> Result<Self> {
        let samples = float_count(&channel)?;
        if samples != renderer.samples() {
            return Err(ShmVizError::SizeMismatch {
                path: channel.path().to_path_buf(),
                expected: renderer.samples() * 4,
                actual: channel.len(),
            });
        }
        Ok(Self {
            channel,
            renderer,
            frame: vec![0.0; samples],
            frames: 0,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn renderer(&self) -> &SpectrumRenderer<'g> {
        &self.renderer
    }

    /// Draws the current frame at the surface's size and presents it.
    pub fn step(&mut self, surface: &mut impl Surface) -> Result<()> {
        self.channel.read_f32_into(&mut self.frame)?;
        let (width, height) = surface.size();
        self.renderer.draw(&self.frame, width, height)?;
        surface.swap_buffers()?;

        self.frames += 1;
        if self.frames % PROGRESS_INTERVAL == 0 {
            debug!(frames = self.frames, "consumer progress");
        }
        Ok(())
    }

    /// Renders until the surface asks to close.
    pub fn run(&mut self, surface: &mut impl Surface) -> Result<()> {
        info!(path = %self.channel.path().display(), "consumer started");
        while !surface.should_close() {
            self.step(surface)?;
        }
        info!(frames = self.frames, "consumer stopped");
        Ok(())
    }

    /// Hands back the renderer, e.g. to free it.
    pub fn into_renderer(self) -> SpectrumRenderer<'g> {
        self.renderer
    }
}

/// Headline numbers of one spectrum frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSummary {
    pub peak_bin: usize,
    pub peak: f32,
    pub mean: f32,
}

impl FrameSummary {
    /// Summarises `frame`, skipping NaN bins. An empty (or all-NaN) frame
    /// summarises to zeros.
    pub fn of(frame: &[f32]) -> Self {
        let mut peak_bin = 0;
        let mut peak = 0.0_f32;
        let mut sum = 0.0_f64;
        let mut count = 0usize;
        for (bin, value) in frame.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            if count == 0 || *value > peak {
                peak_bin = bin;
                peak = *value;
            }
            sum += f64::from(*value);
            count += 1;
        }
        let mean = if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        };
        Self {
            peak_bin,
            peak,
            mean,
        }
    }

    /// Frequency at the centre of the peak bin for a `window`-sample
    /// transform at `sample_rate`.
    pub fn peak_frequency(&self, sample_rate: u32, window: usize) -> f32 {
        self.peak_bin as f32 * sample_rate as f32 / window.max(1) as f32
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "peak bin {} ({:.4}), mean {:.4}",
            self.peak_bin, self.peak, self.mean
        )
    }
}

/// Headless consumer that attaches to a channel and summarises its frames.
#[derive(Debug)]
pub struct Monitor {
    channel: Channel,
    frame: Vec<f32>,
}

impl Monitor {
    pub fn new(channel: Channel) -> Result<Self> {
        let samples = float_count(&channel)?;
        Ok(Self {
            channel,
            frame: vec![0.0; samples],
        })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Number of magnitudes in each frame.
    pub fn bins(&self) -> usize {
        self.frame.len()
    }

    /// Reads the current frame and summarises it.
    pub fn sample(&mut self) -> Result<FrameSummary> {
        self.channel.read_f32_into(&mut self.frame)?;
        Ok(FrameSummary::of(&self.frame))
    }
}
