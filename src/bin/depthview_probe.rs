//! depthview-probe - connect to a depth sensor and report what it streams

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use depthview::{ConnectionStatus, StreamConfig, StreamSession, UpdateRate, ViewMode};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Sensor host name or address.
    #[arg(long, env = "DEPTHVIEW_HOST")]
    host: Option<String>,
    /// Access token passed to the sensor.
    #[arg(long, env = "DEPTHVIEW_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Socket port.
    #[arg(long)]
    port: Option<u16>,
    /// YAML configuration file; command line values override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Initial view mode (color or depth).
    #[arg(long)]
    mode: Option<ViewMode>,
    /// Stop after this many seconds; runs until Ctrl-C otherwise.
    #[arg(long)]
    seconds: Option<u64>,
    /// Maximum frames per second to inspect.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Seconds between status reports.
    #[arg(long, default_value_t = 1)]
    report_every: u64,
    /// Write the last rendered frame here as PNG on exit.
    #[arg(long)]
    png: Option<PathBuf>,
}

impl Args {
    fn stream_config(&self) -> Result<StreamConfig> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::from_yaml_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => StreamConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mode) = self.mode {
            config.view_mode = mode;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if args.report_every == 0 {
        return Err(anyhow!("report-every must be >= 1"));
    }
    let config = args.stream_config()?;

    let mut session = StreamSession::new(config);
    if let Err(err) = session.connect().await {
        for hint in err.recovery_suggestions() {
            warn!("hint: {hint}");
        }
        return Err(err).context("connecting to sensor");
    }

    let rate = UpdateRate::Max(args.fps);
    let mut frames = session.frames(rate);
    let mut statuses = Box::pin(session.status_updates());
    let mut report = tokio::time::interval(Duration::from_secs(args.report_every));
    let deadline = async {
        match args.seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            Some(status) = statuses.next() => {
                info!(status = %status, "Status changed");
                if status == ConnectionStatus::Disconnected || status.error_message().is_some() {
                    break;
                }
            }
            Some(frame) = frames.next() => {
                let (width, height) = frame.dimensions();
                info!(
                    mode = %frame.mode,
                    timestamp = frame.timestamp,
                    width,
                    height,
                    distance_m = frame.probe.map(|p| p.distance_m),
                    "Frame"
                );
            }
            _ = report.tick() => {
                let header = session.current_header();
                let fps = session.frame_rate();
                info!(
                    online = session.is_online(),
                    fps,
                    sampled = fps.is_some_and(|fps| rate.is_limiting(fps)),
                    depth = ?header.as_ref().map(|h| (h.depth.width, h.depth.height)),
                    color = ?header.as_ref().map(|h| (h.left_rgb.width, h.left_rgb.height)),
                    stats = ?session.stats(),
                    "Report"
                );
            }
        }
    }

    let last = session.last_frame();
    session.close().await;

    if let Some(path) = &args.png {
        let frame = last.ok_or_else(|| anyhow!("no frame was rendered, nothing to write"))?;
        let image =
            frame.buffer.to_rgba_image().ok_or_else(|| anyhow!("rendered frame has no pixels"))?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Wrote last frame");
    }

    Ok(())
}
