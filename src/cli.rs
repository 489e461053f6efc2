// SPDX-License-Identifier: GPL-3.0-only

//! Non-interactive commands
//!
//! - Listing camera devices
//! - Composing a strip from files given on the command line
//! - Composing a strip from files picked in a native dialog

use photostrip::Config;
use photostrip::backends::camera::{CameraBackendType, get_backend_for_type};
use photostrip::constants::{PHOTOS_PER_SESSION, file_formats};
use photostrip::errors::SelectionError;
use photostrip::photo::PhotoSet;
use photostrip::pipelines::strip::{Compositor, RenderOutcome};
use photostrip::sources::{SelectionState, SourceOutcome, UploadSource};
use photostrip::storage;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;

/// List camera devices of every backend
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    for backend_type in [CameraBackendType::V4l2, CameraBackendType::Virtual] {
        let backend = get_backend_for_type(backend_type, config.camera.virtual_image.as_deref());
        if !backend.is_available() {
            println!("{}: not available", backend_type);
            continue;
        }

        let cameras = backend.enumerate_cameras();
        if cameras.is_empty() {
            println!("{}: no cameras found", backend_type);
            continue;
        }

        println!("{}:", backend_type);
        for (index, camera) in cameras.iter().enumerate() {
            match &camera.driver {
                Some(driver) => {
                    println!("  [{}] {} ({}, {})", index, camera.name, camera.path, driver)
                }
                None => println!("  [{}] {} ({})", index, camera.name, camera.path),
            }
        }
        println!();
    }

    Ok(())
}

/// Compose a strip from the given files and save it
pub fn compose(
    config: &Config,
    runtime: &Runtime,
    files: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match runtime.block_on(UploadSource::from_paths(files))? {
        SourceOutcome::Complete(set) => compose_and_save(config, runtime, set),
        SourceOutcome::Back => Err("No photos given".into()),
    }
}

/// Pick files in a native dialog until four are selected or the user cancels
pub fn pick(config: &Config, runtime: &Runtime) -> Result<(), Box<dyn std::error::Error>> {
    let mut upload = UploadSource::new();

    loop {
        let files = rfd::FileDialog::new()
            .set_title("Select 4 photos")
            .add_filter("Images", file_formats::IMAGE_EXTENSIONS)
            .pick_files()
            .unwrap_or_default();

        match runtime.block_on(upload.select(files))? {
            SelectionState::Empty => {
                println!("No photos selected.");
                return Ok(());
            }
            SelectionState::Incomplete { count } => {
                eprintln!(
                    "{}",
                    SelectionError::IncompleteSelection {
                        count,
                        required: PHOTOS_PER_SESSION,
                    }
                );
            }
            SelectionState::Complete => {
                for photo in upload.photos() {
                    if let Some(path) = photo.origin_file() {
                        println!("  {}", path.display());
                    }
                }
                println!("{} photos selected.", upload.photos().len());

                match prompt("Enter: confirm | r: reselect | q: back to home > ")? {
                    Review::Confirm if upload.can_confirm() => {
                        if let SourceOutcome::Complete(set) = upload.confirm()? {
                            return compose_and_save(config, runtime, set);
                        }
                    }
                    Review::Confirm | Review::Reselect => {}
                    Review::Back => {
                        upload.back();
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Answer to the selection review prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Confirm,
    Reselect,
    Back,
}

impl Review {
    fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Some(Self::Confirm),
            "r" | "reselect" => Some(Self::Reselect),
            "q" | "b" | "back" => Some(Self::Back),
            _ => None,
        }
    }
}

fn prompt(question: &str) -> io::Result<Review> {
    let stdin = io::stdin();
    loop {
        print!("{}", question);
        io::stdout().flush()?;

        let mut answer = String::new();
        // EOF leaves without composing
        if stdin.lock().read_line(&mut answer)? == 0 {
            return Ok(Review::Back);
        }
        if let Some(review) = Review::parse(&answer) {
            return Ok(review);
        }
    }
}

fn compose_and_save(
    config: &Config,
    runtime: &Runtime,
    photos: PhotoSet,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Composing...");
    let compositor = Compositor::new(config.layout, config.export.jpeg_quality);

    match runtime.block_on(compositor.render(photos)) {
        RenderOutcome::Drawn => {}
        RenderOutcome::Failed(e) => return Err(e.into()),
        RenderOutcome::Superseded => return Err("Render was superseded".into()),
    }

    let Some(encoded) = compositor.export()? else {
        return Err("Nothing to export".into());
    };
    let path = runtime.block_on(storage::save_export(&encoded, &config.export))?;

    println!("Strip saved to: {}", path.display());
    Ok(())
}
