use std::{fmt, str::FromStr, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{Result, ShmVizError};

/// Taper applied to the analysis window before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Blackman,
    Hanning,
    Hamming,
    Nuttall,
    Bartlett,
    Rectangular,
}

impl WindowFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blackman => "blackman",
            Self::Hanning => "hanning",
            Self::Hamming => "hamming",
            Self::Nuttall => "nuttall",
            Self::Bartlett => "bartlett",
            Self::Rectangular => "rectangular",
        }
    }

    /// `size` window coefficients.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let taper: Vec<f64> = match self {
            Self::Blackman => apodize::blackman_iter(size).collect(),
            Self::Hanning => apodize::hanning_iter(size).collect(),
            Self::Hamming => apodize::hamming_iter(size).collect(),
            Self::Nuttall => apodize::nuttall_iter(size).collect(),
            Self::Bartlett => apodize::triangular_iter(size).collect(),
            Self::Rectangular => vec![1.0; size],
        };
        taper.into_iter().map(|v| v as f32).collect()
    }
}

impl FromStr for WindowFunction {
    type Err = ShmVizError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "blackman" => Ok(Self::Blackman),
            "hanning" | "hann" => Ok(Self::Hanning),
            "hamming" => Ok(Self::Hamming),
            "nuttall" => Ok(Self::Nuttall),
            "bartlett" | "triangular" => Ok(Self::Bartlett),
            "rectangular" | "boxcar" => Ok(Self::Rectangular),
            _ => Err(ShmVizError::InvalidInput("unknown window function")),
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sliding-window magnitude spectrum.
///
/// Keeps the most recent `window` samples (zeros until enough have been
/// pushed). Each pushed chunk shifts the window and yields `window / 2 + 1`
/// magnitudes of the tapered window, scaled by `1 / hop`.
pub struct SpectrumAnalyzer {
    window: usize,
    hop: usize,
    function: WindowFunction,
    taper: Vec<f32>,
    history: Vec<f32>,
    fft: FftResources,
}

impl SpectrumAnalyzer {
    pub fn new(window: usize, hop: usize, function: WindowFunction) -> Result<Self> {
        if window < 2 {
            return Err(ShmVizError::InvalidInput(
                "analysis window must hold at least two samples",
            ));
        }
        if hop == 0 {
            return Err(ShmVizError::InvalidInput("hop size must be positive"));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(window);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            window,
            hop,
            function,
            taper: function.coefficients(window),
            history: vec![0.0; window],
            fft,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn function(&self) -> WindowFunction {
        self.function
    }

    /// Number of magnitudes per frame.
    pub fn bins(&self) -> usize {
        self.window / 2 + 1
    }

    /// Clears the sample history back to silence.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
    }

    /// Shifts `samples` into the window and returns the new magnitudes.
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let mut magnitudes = vec![0.0; self.bins()];
        self.push_into(samples, &mut magnitudes)?;
        Ok(magnitudes)
    }

    /// Like [`push`](Self::push), writing into `out` (`bins()` long).
    pub fn push_into(&mut self, samples: &[f32], out: &mut [f32]) -> Result<()> {
        if out.len() != self.bins() {
            return Err(ShmVizError::InvalidInput(
                "output length must equal the number of bins",
            ));
        }

        if samples.len() >= self.window {
            self.history
                .copy_from_slice(&samples[samples.len() - self.window..]);
        } else {
            self.history.rotate_left(samples.len());
            let keep = self.window - samples.len();
            self.history[keep..].copy_from_slice(samples);
        }

        for ((input, sample), weight) in self
            .fft
            .input
            .iter_mut()
            .zip(&self.history)
            .zip(&self.taper)
        {
            *input = sample * weight;
        }

        let fft = &mut self.fft;
        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let scale = 1.0 / self.hop as f32;
        for (slot, bin) in out.iter_mut().zip(&fft.spectrum) {
            *slot = bin.norm() * scale;
        }
        Ok(())
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window", &self.window)
            .field("hop", &self.hop)
            .field("function", &self.function)
            .finish()
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}
