//! Producer loop: audio in, one magnitude frame per hop out.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    analysis::{SpectrumAnalyzer, WindowFunction},
    audio::SampleSource,
    channel::Channel,
    config::ProducerConfig,
    Result, ShmVizError,
};

/// Log a progress line every this many frames.
const PROGRESS_INTERVAL: u64 = 256;

/// Reads hop-sized chunks from a [`SampleSource`], transforms them with a
/// [`SpectrumAnalyzer`] and overwrites the channel with each new frame.
#[derive(Debug)]
pub struct Producer<S> {
    source: S,
    analyzer: SpectrumAnalyzer,
    channel: Channel,
    chunk: Vec<f32>,
    frame: Vec<f32>,
    frames: u64,
}

impl<S: SampleSource> Producer<S> {
    /// The channel must already have the geometry `config` implies
    /// (`4 * (window / 2 + 1)` bytes).
    pub fn new(config: &ProducerConfig, source: S, channel: Channel) -> Result<Self> {
        let analyzer = analyzer_for(config)?;
        Self::assemble(config, source, channel, analyzer)
    }

    /// Validates `config`, then creates (or truncates) the channel
    /// `{base}/{name}` with the matching frame size. An invalid config leaves
    /// an existing channel untouched.
    pub fn create(
        config: &ProducerConfig,
        source: S,
        name: &str,
        base: impl AsRef<Path>,
    ) -> Result<Self> {
        let analyzer = analyzer_for(config)?;
        let channel = Channel::create(name, base, config.frame_bytes())?;
        Self::assemble(config, source, channel, analyzer)
    }

    fn assemble(
        config: &ProducerConfig,
        source: S,
        channel: Channel,
        analyzer: SpectrumAnalyzer,
    ) -> Result<Self> {
        let expected = config.frame_bytes();
        if channel.len() != expected {
            return Err(ShmVizError::SizeMismatch {
                path: channel.path().to_path_buf(),
                expected,
                actual: channel.len(),
            });
        }
        if source.sample_rate() != config.sample_rate {
            warn!(
                source = source.sample_rate(),
                configured = config.sample_rate,
                "sample source rate differs from the configured rate"
            );
        }

        info!(
            window = config.window,
            hop = config.hop,
            function = %analyzer.function(),
            path = %channel.path().display(),
            "producer ready"
        );

        Ok(Self {
            source,
            chunk: vec![0.0; config.hop],
            frame: vec![0.0; analyzer.bins()],
            analyzer,
            channel,
            frames: 0,
        })
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// The most recently written frame.
    pub fn last_frame(&self) -> &[f32] {
        &self.frame
    }

    /// Reads one hop of samples, analyses it and writes one frame. Returns the
    /// number of frames written so far.
    pub fn step(&mut self) -> Result<u64> {
        self.source.read_chunk(&mut self.chunk)?;
        self.analyzer.push_into(&self.chunk, &mut self.frame)?;
        self.channel.write_f32(&self.frame)?;
        self.frames += 1;

        if self.frames % PROGRESS_INTERVAL == 0 {
            debug!(frames = self.frames, "producer progress");
        }
        Ok(self.frames)
    }

    /// Runs until the source or the channel fails. There is no other way out;
    /// the process is expected to be stopped by a signal.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.step()?;
        }
    }
}

fn analyzer_for(config: &ProducerConfig) -> Result<SpectrumAnalyzer> {
    let function: WindowFunction = config.window_function.parse()?;
    SpectrumAnalyzer::new(config.window, config.hop, function)
}
