use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rb_core::config::Config;

#[derive(Parser)]
#[command(name = "ringbuffer")]
#[command(author, version, about = "Rolling buffer of a live video stream")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start capturing and serve the HTTP control API
    Start(StartArgs),

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Overrides applied on top of the config file.
#[derive(clap::Args, Debug, Default)]
pub struct StartArgs {
    /// RTSP stream URL (required unless set in the config file)
    #[arg(long)]
    pub rtsp: Option<String>,

    /// Directory for segment files
    #[arg(long)]
    pub buffer_dir: Option<PathBuf>,

    /// Duration of each segment in seconds
    #[arg(long)]
    pub segment_sec: Option<u64>,

    /// Maximum buffer duration in minutes
    #[arg(long)]
    pub max_buffer_min: Option<u64>,

    /// Maximum buffer size in MB
    #[arg(long)]
    pub max_buffer_mb: Option<u64>,

    /// Output resolution such as 1280x720; omit to keep the source stream
    #[arg(long)]
    pub resolution: Option<String>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP API port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl StartArgs {
    pub fn apply(self, config: &mut Config) {
        if let Some(url) = self.rtsp {
            config.capture.rtsp_url = url;
        }
        if let Some(dir) = self.buffer_dir {
            config.buffer.dir = dir;
        }
        if let Some(secs) = self.segment_sec {
            config.buffer.segment_secs = secs;
        }
        if let Some(mins) = self.max_buffer_min {
            config.buffer.max_age_mins = mins;
        }
        if let Some(mb) = self.max_buffer_mb {
            config.buffer.max_size_mb = mb;
        }
        if let Some(res) = self.resolution.filter(|r| !r.is_empty()) {
            config.capture.resolution = Some(res);
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
