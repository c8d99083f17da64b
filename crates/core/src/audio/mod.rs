use std::f32::consts::TAU;

use crate::Result;

/// Blocking supplier of mono samples for the producer loop.
///
/// `read_chunk` fills the whole buffer, waiting for the device as needed. It
/// is the one suspension point of each producer iteration.
pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<()>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<()> {
        (**self).read_chunk(buf)
    }
}

/// Synthetic fixed-frequency tone. Never blocks.
#[derive(Debug, Clone)]
pub struct SineSource {
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
    phase: f32,
}

impl SineSource {
    pub fn new(sample_rate: u32, frequency: f32) -> Self {
        Self {
            sample_rate,
            frequency,
            amplitude: 1.0,
            phase: 0.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl SampleSource for SineSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<()> {
        let step = TAU * self.frequency / self.sample_rate.max(1) as f32;
        for sample in buf.iter_mut() {
            *sample = self.amplitude * self.phase.sin();
            self.phase = (self.phase + step) % TAU;
        }
        Ok(())
    }
}
