mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, StartArgs};

use rb_core::config::Config;

async fn start(args: StartArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load_or_default(config_path);
    args.apply(&mut config);

    tracing::info!("Ring buffer config:");
    tracing::info!("  RTSP URL: {}", config.capture.rtsp_url);
    tracing::info!("  Buffer dir: {}", config.buffer.dir.display());
    tracing::info!("  Segment duration: {}s", config.buffer.segment_secs);
    tracing::info!(
        "  Max buffer: {} min / {} MB",
        config.buffer.max_age_mins,
        config.buffer.max_size_mb
    );
    tracing::info!(
        "  Resolution: {}",
        config.capture.resolution.as_deref().unwrap_or("original")
    );

    rb_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ringbuffer=trace,rb_server=debug,rb_engine=trace,rb_av=debug,tower_http=debug"
                .to_string()
        } else {
            "ringbuffer=debug,rb_server=info,rb_engine=debug,rb_av=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(args, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("ringbuffer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = rb_av::ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg is required for capture, saves and frames.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Buffer dir: {}", config.buffer.dir.display());
    println!(
        "  Segments: {}s, keep {} min / {} MB",
        config.buffer.segment_secs, config.buffer.max_age_mins, config.buffer.max_size_mb
    );

    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }
    if let Err(e) = config.check() {
        println!("  ✗ Not startable: {e}");
    }

    println!("\nEffective config:");
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
