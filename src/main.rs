use clap::{Parser, ValueEnum};
use mic_stream::streaming::{
    GeneratorConfig, GeneratorSource, HostInterface, Pipeline, SignalType, TcpTransport,
};
use mic_stream::{Credentials, StreamerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stream a rolling window of microphone samples to a TCP collector
#[derive(Parser, Debug)]
#[command(name = "mic-stream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields use defaults
    #[arg(short, long, env = "MIC_STREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Built-in configuration used when no file is given
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    preset: Preset,

    /// Collector address (host:port)
    #[arg(short, long, env = "MIC_STREAM_ENDPOINT")]
    endpoint: Option<String>,

    /// Samples per window
    #[arg(long)]
    buffer_length: Option<usize>,

    /// Sampling period in milliseconds
    #[arg(long)]
    sample_period_ms: Option<u64>,

    /// Transmission period in milliseconds
    #[arg(long)]
    send_period_ms: Option<u64>,

    /// Delay after a failed connect, in milliseconds
    #[arg(long)]
    reconnect_backoff_ms: Option<u64>,

    /// Network name handed to the interface
    #[arg(long, env = "MIC_STREAM_SSID")]
    ssid: Option<String>,

    /// Network passphrase
    #[arg(long, env = "MIC_STREAM_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Waveform fed to the sampler in place of a converter
    #[arg(long, value_enum, default_value_t = Signal::Sine)]
    signal: Signal,

    /// Waveform frequency in Hz
    #[arg(long, default_value = "2.0")]
    frequency: f64,

    /// Waveform amplitude relative to full scale
    #[arg(long, default_value = "0.5")]
    amplitude: f64,

    /// Seconds between status log lines
    #[arg(long, default_value = "10")]
    report_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Default,
    LowLatency,
    ConstrainedLink,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Signal {
    Sine,
    Square,
    Triangle,
    Noise,
    Silence,
}

impl Cli {
    fn streamer_config(&self) -> Result<StreamerConfig, mic_stream::ConfigError> {
        let mut config = match &self.config {
            Some(path) => StreamerConfig::from_json_file(path)?,
            None => match self.preset {
                Preset::Default => StreamerConfig::default(),
                Preset::LowLatency => StreamerConfig::low_latency(),
                Preset::ConstrainedLink => StreamerConfig::constrained_link(),
            },
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(len) = self.buffer_length {
            config.buffer_length = len;
        }
        if let Some(ms) = self.sample_period_ms {
            config.sample_period_ms = ms;
        }
        if let Some(ms) = self.send_period_ms {
            config.send_period_ms = ms;
        }
        if let Some(ms) = self.reconnect_backoff_ms {
            config.reconnect_backoff_ms = ms;
        }
        if let Some(ssid) = &self.ssid {
            config.credentials = Some(Credentials {
                ssid: ssid.clone(),
                passphrase: self.passphrase.clone().unwrap_or_default(),
            });
        }

        config.validate()?;
        Ok(config)
    }

    fn signal_type(&self) -> SignalType {
        let frequency = self.frequency;
        match self.signal {
            Signal::Sine => SignalType::Sine { frequency },
            Signal::Square => SignalType::Square {
                frequency,
                duty_cycle: 0.5,
            },
            Signal::Triangle => SignalType::Triangle { frequency },
            Signal::Noise => SignalType::WhiteNoise,
            Signal::Silence => SignalType::Silence,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mic_stream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.streamer_config()?;

    let source = GeneratorSource::new(GeneratorConfig {
        signal_type: cli.signal_type(),
        amplitude: cli.amplitude,
        sample_rate: GeneratorConfig::rate_for_period(config.sample_period()),
        scale: config.raw_scale(),
    })?;
    let interface = HostInterface::new(config.credentials.clone());

    let pipeline = Pipeline::start(&config, source, TcpTransport::default(), interface)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut report = tokio::time::interval(Duration::from_secs(cli.report_secs.max(1)));
    report.tick().await;

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res?;
                info!("Interrupt received, shutting down");
                break;
            }
            _ = report.tick() => {
                let stats = pipeline.stats();
                info!(
                    state = ?pipeline.connection_state(),
                    link_ready = pipeline.link().is_link_ready(),
                    samples = stats.samples_pushed,
                    windows = stats.windows_sent,
                    connect_failures = stats.connect_failures,
                    "Status"
                );
                if pipeline.is_transmitter_finished() {
                    warn!("Transmitter stopped, shutting down");
                    break;
                }
            }
        }
    }

    let stats = pipeline.shutdown().await?;
    info!(summary = %stats_summary(&stats), "Final counters");
    Ok(())
}

fn stats_summary(stats: &mic_stream::streaming::PipelineStatsSnapshot) -> String {
    format!(
        "samples={} read_errors={} windows={} bytes={} connects={}/{} write_failures={} link_losses={}",
        stats.samples_pushed,
        stats.read_errors,
        stats.windows_sent,
        stats.bytes_sent,
        stats.connect_attempts.saturating_sub(stats.connect_failures),
        stats.connect_attempts,
        stats.write_failures,
        stats.link_losses,
    )
}
