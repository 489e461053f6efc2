// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use photostrip::{Config, storage};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "photostrip")]
#[command(about = "Photo booth: four photos, two print-ready strips")]
#[command(version = photostrip::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Countdown start value before each photo
    #[arg(long, global = true, value_name = "N")]
    countdown: Option<u32>,

    /// Length of one countdown step in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    time_unit_ms: Option<u64>,

    /// Use the virtual camera (looping IMAGE, or a test pattern)
    #[arg(long = "virtual", global = true, value_name = "IMAGE", num_args = 0..=1)]
    virtual_camera: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive booth in the terminal (default)
    Booth {
        /// Camera index to use (from 'photostrip list')
        #[arg(short, long)]
        device: Option<usize>,

        /// Output directory (default: ~/Pictures/photostrip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compose a strip from four image files
    Compose {
        /// Image files; only the first four are used
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory (default: ~/Pictures/photostrip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pick four photos in a file dialog and compose a strip
    Pick {
        /// Output directory (default: ~/Pictures/photostrip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available cameras
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Booth {
        device: None,
        output: None,
    });

    // The booth owns the terminal, so its logs go to a file
    // Set RUST_LOG to control the level, e.g. RUST_LOG=photostrip=debug
    init_logging(matches!(command, Commands::Booth { .. }));

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(countdown) = cli.countdown {
        config.timing.countdown_start = countdown;
    }
    if let Some(ms) = cli.time_unit_ms {
        config.timing.time_unit_ms = ms;
    }
    if let Some(image) = cli.virtual_camera {
        config.camera.backend = photostrip::backends::camera::CameraBackendType::Virtual;
        config.camera.virtual_image = image;
    }

    let runtime = tokio::runtime::Runtime::new()?;

    match command {
        Commands::Booth { device, output } => {
            if let Some(device) = device {
                config.camera.device_index = device;
            }
            apply_output(&mut config, output);
            config.validate()?;
            photostrip::terminal::run(config, &runtime)
        }
        Commands::Compose { files, output } => {
            apply_output(&mut config, output);
            config.validate()?;
            cli::compose(&config, &runtime, files)
        }
        Commands::Pick { output } => {
            apply_output(&mut config, output);
            config.validate()?;
            cli::pick(&config, &runtime)
        }
        Commands::List => cli::list_cameras(&config),
    }
}

fn apply_output(config: &mut Config, output: Option<PathBuf>) {
    if output.is_some() {
        config.export.output_dir = output;
    }
}

fn init_logging(to_file: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let log_file = to_file
        .then(storage::log_dir)
        .flatten()
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            File::create(dir.join("photostrip.log")).ok()
        });

    match log_file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None if to_file => builder.with_writer(std::io::sink).init(),
        None => builder.init(),
    }
}
