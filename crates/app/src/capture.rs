//! Default input device capture through `cpal`, downmixed to mono.

use std::collections::VecDeque;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::{bounded, Receiver, TrySendError};
use shmviz_core::{Result, SampleSource, ShmVizError};

/// Blocks buffered between the audio callback and the producer loop. When the
/// loop falls behind, newer blocks are dropped.
const QUEUE_DEPTH: usize = 64;

/// Live input from the host's default capture device.
pub struct CaptureSource {
    // Capture stops when the stream is dropped.
    _stream: cpal::Stream,
    blocks: Receiver<Vec<f32>>,
    pending: VecDeque<f32>,
    sample_rate: u32,
}

impl CaptureSource {
    pub fn open_default(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ShmVizError::msg("no default audio input device"))?;
        let supported = device
            .default_input_config()
            .map_err(|err| ShmVizError::msg(format!("querying input config: {err}")))?;
        let channels = usize::from(supported.channels().max(1));

        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sender, blocks) = bounded(QUEUE_DEPTH);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = data
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                        .collect();
                    if let Err(TrySendError::Disconnected(_)) = sender.try_send(mono) {
                        tracing::debug!("capture receiver gone");
                    }
                },
                |err| tracing::warn!(%err, "audio input stream error"),
                None,
            )
            .map_err(|err| {
                ShmVizError::msg(format!(
                    "opening input stream at {sample_rate} Hz (f32 samples): {err}"
                ))
            })?;
        stream
            .play()
            .map_err(|err| ShmVizError::msg(format!("starting input stream: {err}")))?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            channels,
            sample_rate,
            "capturing audio"
        );

        Ok(Self {
            _stream: stream,
            blocks,
            pending: VecDeque::new(),
            sample_rate,
        })
    }
}

impl SampleSource for CaptureSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_chunk(&mut self, buf: &mut [f32]) -> Result<()> {
        while self.pending.len() < buf.len() {
            let block = self
                .blocks
                .recv()
                .map_err(|_| ShmVizError::msg("audio input stream closed"))?;
            self.pending.extend(block);
        }
        let len = buf.len();
        for (slot, sample) in buf.iter_mut().zip(self.pending.drain(..len)) {
            *slot = sample;
        }
        Ok(())
    }
}
