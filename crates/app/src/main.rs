mod capture;

use std::{path::PathBuf, thread, time::Duration};

use clap::{Args, Parser, Subcommand};
use shmviz_core::{
    AppConfig, Channel, Monitor, Producer, SampleSource, ShmVizError, SineSource,
};
use tracing_subscriber::EnvFilter;

use crate::capture::CaptureSource;

fn main() -> shmviz_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Produce(args) => run_produce(args),
        Commands::Monitor {
            channel,
            interval_ms,
            count,
            json,
        } => run_monitor(&channel, interval_ms, count, json),
        Commands::Info { channel } => run_info(&channel),
    }
}

fn run_produce(args: ProduceArgs) -> shmviz_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    args.channel.apply(&mut config);
    let producer_config = &mut config.producer;
    if let Some(window) = args.window {
        producer_config.window = window;
    }
    if let Some(frames) = args.frames {
        producer_config.hop = frames;
    }
    if let Some(rate) = args.rate {
        producer_config.sample_rate = rate;
    }
    if let Some(function) = args.window_func {
        producer_config.window_function = function;
    }

    let producer_config = &config.producer;
    tracing::info!(
        latency_ms = producer_config.latency_seconds() * 1000.0,
        framerate = producer_config.frames_per_second(),
        data_file_bytes = producer_config.frame_bytes(),
        "producer parameters"
    );

    let source: Box<dyn SampleSource> = match args.sine {
        Some(frequency) => {
            tracing::info!(frequency, "using synthetic sine source");
            Box::new(SineSource::new(producer_config.sample_rate, frequency))
        }
        None => Box::new(CaptureSource::open_default(producer_config.sample_rate)?),
    };

    // Validated before the channel file is truncated.
    Producer::create(
        producer_config,
        source,
        &config.channel.name,
        &config.channel.base_path,
    )?
    .run()
}

fn run_monitor(
    args: &ChannelArgs,
    interval_ms: u64,
    count: Option<u64>,
    json: bool,
) -> shmviz_core::Result<()> {
    let config = args.resolve();
    let channel = Channel::open(&config.name, &config.base_path)?;
    let mut monitor = Monitor::new(channel)?;
    tracing::info!(
        path = %monitor.channel().path().display(),
        bins = monitor.bins(),
        "monitoring channel"
    );

    let interval = Duration::from_millis(interval_ms);
    let mut seen = 0u64;
    while count.map_or(true, |limit| seen < limit) {
        let summary = monitor.sample()?;
        if json {
            let line = serde_json::to_string(&summary)
                .map_err(|err| ShmVizError::msg(format!("encoding frame summary: {err}")))?;
            println!("{line}");
        } else {
            tracing::info!(%summary, "frame");
        }
        seen += 1;
        thread::sleep(interval);
    }
    Ok(())
}

fn run_info(args: &ChannelArgs) -> shmviz_core::Result<()> {
    let config = args.resolve();
    let channel = Channel::open(&config.name, &config.base_path)?;
    println!("path:  {}", channel.path().display());
    println!("bytes: {}", channel.len());
    if channel.len() % 4 == 0 {
        println!("bins:  {}", channel.len() / 4);
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Shared-memory spectrum producer and monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Location of the frame channel.
#[derive(Args, Debug)]
struct ChannelArgs {
    /// Directory holding the channel's data file.
    #[arg(short = 'B', long)]
    base: Option<PathBuf>,
    /// Name of the channel's data file.
    #[arg(short, long)]
    name: Option<String>,
}

impl ChannelArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(base) = &self.base {
            config.channel.base_path = base.clone();
        }
        if let Some(name) = &self.name {
            config.channel.name = name.clone();
        }
    }

    fn resolve(&self) -> shmviz_core::ChannelConfig {
        let mut config = AppConfig::default();
        self.apply(&mut config);
        config.channel
    }
}

#[derive(Args, Debug)]
struct ProduceArgs {
    #[command(flatten)]
    channel: ChannelArgs,
    /// Number of samples in the FFT window.
    #[arg(short = 'W', long)]
    window: Option<usize>,
    /// Number of samples read per FFT calculation.
    #[arg(short, long)]
    frames: Option<usize>,
    /// Sample rate to capture at.
    #[arg(short, long)]
    rate: Option<u32>,
    /// Taper applied before the transform (blackman, hanning, hamming, ...).
    #[arg(long = "window-func")]
    window_func: Option<String>,
    /// JSON configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Analyse a sine tone of this frequency instead of the input device.
    #[arg(long, value_name = "HZ")]
    sine: Option<f32>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture audio and publish spectrum frames to the channel.
    Produce(ProduceArgs),
    /// Attach to a running producer and log frame summaries.
    Monitor {
        #[command(flatten)]
        channel: ChannelArgs,
        /// Delay between samples.
        #[arg(short, long, default_value_t = 500)]
        interval_ms: u64,
        /// Stop after this many samples.
        #[arg(long)]
        count: Option<u64>,
        /// Print each summary as a JSON line on stdout instead of logging it.
        #[arg(long)]
        json: bool,
    },
    /// Print the channel's path and size.
    Info {
        #[command(flatten)]
        channel: ChannelArgs,
    },
}
