// SPDX-License-Identifier: GPL-3.0-only

//! Terminal photo booth
//!
//! Renders the live feed, countdown, flash and the finished strip to the
//! terminal using Unicode half-block characters for improved vertical
//! resolution.

use crate::backends::camera::types::CameraFrame;
use crate::backends::camera::{CameraBackend, get_backend_for_type};
use crate::capture::{CaptureView, Phase, SessionHandle};
use crate::config::Config;
use crate::constants::{PHOTOS_PER_SESSION, file_formats};
use crate::geometry::CropOverlay;
use crate::photo::PhotoSet;
use crate::pipelines::strip::{Compositor, RenderOutcome};
use crate::sources::{CameraSource, SelectionState, SourceOutcome, UploadSource};
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Run the interactive booth until the user quits
pub fn run(config: Config, runtime: &Runtime) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut booth = Booth::new(config, runtime);
    let result = booth.run(&mut terminal);
    booth.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

enum Stage {
    /// Entry point: choose camera or upload
    Menu,
    Capture {
        handle: SessionHandle,
        view: watch::Receiver<CaptureView>,
        task: JoinHandle<SourceOutcome>,
    },
    /// Selected files waiting for confirmation
    Upload,
    Editor {
        compositor: Compositor,
        preview: Option<Arc<CameraFrame>>,
    },
}

enum Flow {
    Continue,
    Quit,
}

struct Booth<'a> {
    config: Config,
    runtime: &'a Runtime,
    camera: Arc<dyn CameraBackend>,
    upload: UploadSource,
    stage: Stage,
    status: Option<String>,
    /// Path of the last saved strip, for `o`
    last_export: Option<PathBuf>,
}

impl<'a> Booth<'a> {
    fn new(config: Config, runtime: &'a Runtime) -> Self {
        let camera = get_backend_for_type(
            config.camera.backend,
            config.camera.virtual_image.as_deref(),
        );
        Self {
            config,
            runtime,
            camera,
            upload: UploadSource::new(),
            stage: Stage::Menu,
            status: None,
            last_export: None,
        }
    }

    fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            self.poll_capture();

            terminal.draw(|f| self.draw(f))?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
                if let Flow::Quit = self.handle_key(key) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Cancel a running session and wait until it has released the camera
    fn shutdown(&mut self) {
        if let Stage::Capture { handle, task, .. } =
            std::mem::replace(&mut self.stage, Stage::Menu)
        {
            handle.cancel();
            let _ = self.runtime.block_on(task);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match &self.stage {
            Stage::Menu => match key.code {
                KeyCode::Char('c') => self.enter_camera(),
                KeyCode::Char('u') => self.pick_upload(),
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
            Stage::Capture { handle, .. } => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => handle.start(),
                KeyCode::Esc | KeyCode::Char('q') => handle.cancel(),
                _ => {}
            },
            Stage::Upload => match key.code {
                KeyCode::Enter | KeyCode::Char('y') => self.confirm_upload(),
                KeyCode::Char('u') => self.pick_upload(),
                KeyCode::Esc | KeyCode::Char('b') => {
                    self.upload.back();
                    self.stage = Stage::Menu;
                    self.status = None;
                }
                _ => {}
            },
            Stage::Editor { compositor, .. } => match key.code {
                KeyCode::Char('s') if compositor.has_drawn() => match self.save(compositor) {
                    Ok(path) => {
                        self.status = Some(format!("Saved: {}", path.display()));
                        self.last_export = Some(path);
                    }
                    Err(msg) => self.status = Some(msg),
                },
                KeyCode::Char('o') => {
                    if let Some(path) = &self.last_export
                        && let Err(e) = open::that(path)
                    {
                        warn!(error = %e, "Failed to open saved strip");
                        self.status = Some(format!("Error: {}", e));
                    }
                }
                KeyCode::Char('r') => {
                    compositor.close();
                    info!("Restarting booth");
                    self.stage = Stage::Menu;
                    self.status = None;
                    self.last_export = None;
                }
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
        }
        Flow::Continue
    }

    fn enter_camera(&mut self) {
        let source = CameraSource::new(
            Arc::clone(&self.camera),
            self.config.camera.stream_request(),
            self.config.session_timing(),
        );
        let (handle, run) = source.begin();
        let task = self.runtime.spawn(run);
        self.status = None;
        self.stage = Stage::Capture {
            view: handle.view(),
            handle,
            task,
        };
    }

    /// Open the file dialog; the selection replaces any previous one
    fn pick_upload(&mut self) {
        let files = rfd::FileDialog::new()
            .set_title("Select 4 photos")
            .add_filter("Images", file_formats::IMAGE_EXTENSIONS)
            .pick_files()
            .unwrap_or_default();

        match self.runtime.block_on(self.upload.select(files)) {
            Ok(SelectionState::Empty) => {
                self.stage = Stage::Menu;
                self.status = None;
            }
            Ok(_) => {
                self.stage = Stage::Upload;
                self.status = None;
            }
            Err(e) => {
                self.stage = Stage::Menu;
                self.status = Some(e.to_string());
            }
        }
    }

    fn confirm_upload(&mut self) {
        if !self.upload.can_confirm() {
            debug!("Confirmation blocked, selection incomplete");
            return;
        }
        match self.upload.confirm() {
            Ok(SourceOutcome::Complete(set)) => self.open_editor(set),
            Ok(SourceOutcome::Back) => self.stage = Stage::Menu,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Move on once the capture task has finished
    fn poll_capture(&mut self) {
        let finished = matches!(&self.stage, Stage::Capture { task, .. } if task.is_finished());
        if !finished {
            return;
        }
        let Stage::Capture { task, .. } = std::mem::replace(&mut self.stage, Stage::Menu) else {
            return;
        };
        match self.runtime.block_on(task) {
            Ok(SourceOutcome::Complete(set)) => self.open_editor(set),
            Ok(SourceOutcome::Back) => self.status = None,
            Err(e) => {
                error!(error = %e, "Capture task failed");
                self.status = Some(format!("Error: {}", e));
            }
        }
    }

    fn open_editor(&mut self, photos: PhotoSet) {
        let compositor = Compositor::new(self.config.layout, self.config.export.jpeg_quality);
        let preview = match self.runtime.block_on(compositor.render(photos)) {
            RenderOutcome::Drawn => compositor.canvas().and_then(|canvas| {
                CameraFrame::from_image(image::DynamicImage::ImageRgb8(canvas).to_rgba8())
                    .map(Arc::new)
            }),
            RenderOutcome::Failed(e) => {
                self.status = Some(format!("Error: {}", e));
                None
            }
            RenderOutcome::Superseded => None,
        };
        self.stage = Stage::Editor {
            compositor,
            preview,
        };
    }

    fn save(&self, compositor: &Compositor) -> Result<PathBuf, String> {
        let encoded = match compositor.export() {
            Ok(Some(encoded)) => encoded,
            Ok(None) => return Err("Nothing to save yet".to_string()),
            Err(e) => return Err(format!("Error: {}", e)),
        };
        self.runtime
            .block_on(storage::save_export(&encoded, &self.config.export))
            .map_err(|e| {
                error!(error = %e, "Failed to save strip");
                format!("Error: {}", e)
            })
    }

    fn draw(&self, f: &mut Frame) {
        let area = f.area();
        let main_area = Rect {
            height: area.height.saturating_sub(1),
            ..area
        };
        let status_area = Rect {
            x: area.x,
            y: area.height.saturating_sub(1),
            width: area.width,
            height: 1,
        };

        let message = match &self.stage {
            Stage::Menu => {
                f.render_widget(&FrameWidget::placeholder("Photo strip booth"), main_area);
                with_status(&self.status, "c: camera | u: upload photos | q: quit")
            }
            Stage::Capture { view, .. } => {
                let view = view.borrow().clone();
                let aspect = self.config.layout.strip_layout().photo_aspect_ratio();
                f.render_widget(&CaptureWidget { view: &view, aspect }, main_area);
                capture_status(&view)
            }
            Stage::Upload => {
                f.render_widget(&FrameWidget::placeholder("Upload photos"), main_area);
                with_status(&self.status, &upload_status(&self.upload))
            }
            Stage::Editor {
                compositor,
                preview,
            } => {
                let widget = FrameWidget {
                    frame: preview.clone(),
                    overlay: None,
                    placeholder: "Nothing rendered",
                };
                f.render_widget(&widget, main_area);
                let keys = if compositor.has_drawn() {
                    "s: save | o: open saved | r: restart | q: quit"
                } else {
                    "r: restart | q: quit"
                };
                with_status(&self.status, keys)
            }
        };
        f.render_widget(StatusBar { message: &message }, status_area);
    }
}

fn with_status(status: &Option<String>, keys: &str) -> String {
    match status {
        Some(status) => format!("{} | {}", status, keys),
        None => keys.to_string(),
    }
}

fn upload_status(upload: &UploadSource) -> String {
    match upload.state() {
        SelectionState::Complete => format!(
            "{} photos selected | Enter: confirm | u: reselect | Esc: back to home",
            upload.photos().len()
        ),
        SelectionState::Incomplete { count } => format!(
            "Please select exactly {} photos ({} selected) | u: reselect | Esc: back to home",
            PHOTOS_PER_SESSION, count
        ),
        SelectionState::Empty => "No photos selected | u: select | Esc: back to home".to_string(),
    }
}

fn capture_status(view: &CaptureView) -> String {
    if let Some(err) = &view.error {
        return format!("{} | Esc: back", err.user_message());
    }
    if !view.camera_ready {
        return "Loading camera... | Esc: back".to_string();
    }
    match view.phase {
        Phase::Idle => "Ready? Enter/Space: start | Esc: back".to_string(),
        Phase::Countdown(_) | Phase::Capturing => format!(
            "Taking photo {} of {} | Esc: cancel",
            (view.photos_taken + 1).min(PHOTOS_PER_SESSION),
            PHOTOS_PER_SESSION
        ),
        Phase::Cooldown => format!(
            "Taking photo {} of {} | Esc: cancel",
            view.photos_taken, PHOTOS_PER_SESSION
        ),
        Phase::SessionComplete | Phase::HandedOff => "Processing...".to_string(),
        Phase::Cancelled => "Cancelled".to_string(),
    }
}

/// Live preview with crop bars, countdown and flash
struct CaptureWidget<'a> {
    view: &'a CaptureView,
    aspect: f64,
}

impl Widget for &CaptureWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.view.flash_active {
            for y in area.y..area.y + area.height {
                for x in area.x..area.x + area.width {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(' ');
                        cell.set_bg(Color::White);
                    }
                }
            }
            return;
        }

        let frame = self.view.display_frame().cloned();
        // Bars are measured on the actual frame, whatever its aspect
        let overlay = frame
            .as_ref()
            .map(|f| CropOverlay::for_container(f.width as f64, f.height as f64, self.aspect));
        let placeholder = match &self.view.error {
            Some(err) => err.user_message(),
            None => "Loading camera...",
        };
        let preview = FrameWidget {
            frame,
            overlay,
            placeholder,
        };
        (&preview).render(area, buf);

        if let Some(n) = self.view.countdown {
            let text = format!("  {}  ", n);
            let x = area.x + area.width.saturating_sub(text.len() as u16) / 2;
            let y = area.y + area.height / 2;
            buf.set_string(
                x,
                y,
                text,
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        }
    }
}

/// Widget that renders a frame using half-block characters
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
    overlay: Option<CropOverlay>,
    placeholder: &'static str,
}

impl FrameWidget {
    fn placeholder(message: &'static str) -> Self {
        Self {
            frame: None,
            overlay: None,
            placeholder: message,
        }
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.aspect_ratio();
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;
        let (fw, fh) = (frame.width as f64, frame.height as f64);

        let sample = |x: u32, y: u32| -> Color {
            let (r, g, b) = frame.pixel_rgb(x, y);
            match self.overlay {
                Some(overlay) if overlay.is_masked(x as f64, y as f64, fw, fh) => {
                    Color::Rgb(r / 3, g / 3, b / 3)
                }
                _ => Color::Rgb(r, g, b),
            }
        };

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample(src_x, src_y_top));
                    cell.set_bg(sample(src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
