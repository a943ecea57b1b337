pub mod canvas;

use std::{
    path::PathBuf,
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};

use anyhow::Result;
use eframe::{
    egui::{self, Color32, ViewportCommand},
    App, Frame,
};
use tracing::{info, warn};

use crate::{
    cache::{ImageCache, LoadResult},
    crop::CropEngine,
    export::{ExportRequest, Exporter, OutputFormat},
    fs_utils::unique_destination,
    loader::LoaderPool,
    navigator::{resolve_step, Navigator, NAV_DEBOUNCE},
    record::RecordStore,
    sequence::Sequence,
    ui::{KeyboardState, ViewMetrics},
};

use self::canvas::Canvas;

/// Dwell time before an image's auto-computed crop counts as accepted.
pub const TOUCH_DWELL: Duration = Duration::from_secs(1);

pub struct AppConfig {
    pub files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub ratio: String,
    pub target_width: u32,
    pub quality: u8,
    pub format: OutputFormat,
    pub export_threads: usize,
    pub decode_threads: usize,
    pub window_radius: usize,
    pub proxy_size: u32,
}

pub struct BatchCropApp {
    sequence: Sequence,
    records: RecordStore,
    cache: ImageCache,
    result_rx: Receiver<LoadResult>,
    exporter: Exporter,
    navigator: Navigator,
    engine: Option<CropEngine>,
    canvas: Canvas,
    texture: Option<egui::TextureHandle>,
    current: Option<PathBuf>,
    /// Path and quality currently uploaded to the texture.
    displayed: Option<(PathBuf, bool)>,
    ratio_label: String,
    preview_all: bool,
    touch_deadline: Option<Instant>,
    status: String,
    finished: bool,
    exit_attempt_count: usize,
    output_dir: PathBuf,
    target_width: u32,
    quality: u8,
    format: OutputFormat,
}

impl BatchCropApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        let (request_tx, result_rx) = LoaderPool::spawn(config.decode_threads);
        let cache = ImageCache::new(config.window_radius, config.proxy_size, request_tx);
        let exporter = Exporter::new(config.export_threads);

        let first = config.files.first().cloned();
        let mut app = Self {
            sequence: Sequence::new(config.files),
            records: RecordStore::default(),
            cache,
            result_rx,
            exporter,
            navigator: Navigator::new(NAV_DEBOUNCE),
            engine: None,
            canvas: Canvas::new(),
            texture: None,
            current: None,
            displayed: None,
            ratio_label: config.ratio,
            preview_all: false,
            touch_deadline: None,
            status: String::from("Ready"),
            finished: false,
            exit_attempt_count: 0,
            output_dir: config.output_dir,
            target_width: config.target_width,
            quality: config.quality,
            format: config.format,
        };
        if let Some(path) = first {
            app.display_image(path, &cc.egui_ctx);
        }
        Ok(app)
    }

    fn current_index(&self) -> Option<usize> {
        self.current
            .as_deref()
            .and_then(|p| self.sequence.index_of(p))
    }

    /// Persist the on-screen crop and transform into the current record.
    fn save_current_state(&mut self) {
        if let (Some(path), Some(engine)) = (self.current.clone(), self.engine.as_ref()) {
            let ratio = engine.ratio_label().to_owned();
            let record = self.records.entry(&path, &ratio);
            record.crop = Some(engine.normalized_crop());
            record.ratio_label = ratio;
            record.transform = engine.transform_state();
        }
    }

    fn mark_current_touched(&mut self) {
        self.touch_deadline = None;
        let Some(path) = self.current.clone() else {
            return;
        };
        if self.engine.is_none() {
            // nothing on screen yet; don't capture a stub crop
            return;
        }
        self.save_current_state();
        self.records.entry(&path, &self.ratio_label).touched = true;
    }

    fn display_image(&mut self, path: PathBuf, ctx: &egui::Context) {
        if self.current.as_ref() == Some(&path) {
            return;
        }
        self.save_current_state();

        let record = self.records.entry(&path, &self.ratio_label);
        self.ratio_label = record.ratio_label.clone();
        self.touch_deadline = (!record.touched).then(|| Instant::now() + TOUCH_DWELL);

        self.current = Some(path.clone());
        self.displayed = None;
        self.engine = None;
        self.canvas.clear();

        self.cache.update_window(&path, self.sequence.paths());
        self.status = match self.sequence.index_of(&path) {
            Some(idx) => format!("{} ({}/{})", path.display(), idx + 1, self.sequence.len()),
            None => path.display().to_string(),
        };
        // a neighbor revisited inside the window is usually still cached
        self.refresh_displayed(ctx);
    }

    /// Upload the best cached bitmap for the current image and (re)build the
    /// engine from its record. Skips proxy results once a full-quality
    /// bitmap is on screen.
    fn refresh_displayed(&mut self, ctx: &egui::Context) {
        let Some(path) = self.current.clone() else {
            return;
        };
        let Some((bitmap, is_full)) = self.cache.get(&path) else {
            return;
        };
        if let Some((shown, shown_full)) = &self.displayed {
            if *shown == path && (*shown_full || !is_full) {
                return;
            }
        }
        let bitmap = bitmap.clone();
        let size = egui::vec2(bitmap.size[0] as f32, bitmap.size[1] as f32);

        if let Some(texture) = self.texture.as_mut() {
            texture.set(bitmap, egui::TextureOptions::LINEAR);
        } else {
            self.texture =
                Some(ctx.load_texture("batchcrop-current", bitmap, egui::TextureOptions::LINEAR));
        }

        match self.engine.as_mut() {
            Some(engine) => engine.set_image_size(size),
            None => {
                let record = self.records.entry(&path, &self.ratio_label);
                let mut engine = CropEngine::new(size, &record.ratio_label);
                engine.set_transform_state(record.transform);
                match (record.touched, record.crop) {
                    (true, Some(crop)) => engine.restore_crop(crop),
                    _ => engine.reset_crop(),
                }
                engine.set_preview(self.preview_all);
                engine.take_changed();
                self.engine = Some(engine);
            }
        }
        self.displayed = Some((path, is_full));
    }

    fn toggle_skip_current(&mut self) {
        let Some(path) = self.current.clone() else {
            return;
        };
        let hidden = self.records.toggle_hidden(&path, &self.ratio_label);
        self.status = if hidden {
            format!("Skipped {}", path.display())
        } else {
            format!("Unskipped {}", path.display())
        };
    }

    fn remove_current(&mut self, ctx: &egui::Context) {
        let Some(path) = self.current.clone() else {
            return;
        };
        let neighbor = self.sequence.index_of(&path).and_then(|idx| {
            self.sequence
                .get(idx + 1)
                .or_else(|| idx.checked_sub(1).and_then(|i| self.sequence.get(i)))
                .cloned()
        });
        self.sequence.remove(&path);
        self.records.remove(&path);
        self.cache.remove(&path);
        self.current = None;
        self.displayed = None;
        self.engine = None;
        match neighbor {
            Some(next) => self.display_image(next, ctx),
            None => self.status = "No images remaining".into(),
        }
    }

    fn set_preview_all(&mut self, preview: bool) {
        self.preview_all = preview;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_preview(preview);
        }
    }

    fn export_all(&mut self) {
        self.save_current_state();
        let mut queued = 0usize;
        for path in self.sequence.paths().to_vec() {
            if self.records.is_hidden(&path) {
                continue;
            }
            let record = self.records.get(&path);
            let crop = record.and_then(|r| r.touched.then_some(r.crop).flatten());
            let transform = record.map(|r| r.transform).unwrap_or_default();
            let ratio = record
                .map(|r| r.ratio_label.clone())
                .unwrap_or_else(|| self.ratio_label.clone());
            let aspect =
                crate::crop::parse_ratio_label(&ratio).unwrap_or(crate::crop::DEFAULT_ASPECT);

            let file_name = match path.file_stem() {
                Some(stem) => {
                    let mut name = stem.to_os_string();
                    name.push(".");
                    name.push(self.format.extension());
                    name
                }
                None => continue,
            };
            let output = unique_destination(&self.output_dir, &file_name);
            let request = ExportRequest {
                source: path.clone(),
                output,
                crop,
                aspect,
                transform,
                target_width: Some(self.target_width),
                quality: self.quality,
                format: self.format,
            };
            if let Err(err) = self.exporter.queue(request) {
                warn!(path = %path.display(), "failed to queue export: {err:#}");
                continue;
            }
            queued += 1;
        }
        self.status = format!(
            "Exporting {} images to {}",
            queued,
            self.output_dir.display()
        );
    }

    fn set_ratio_preset(&mut self, label: &str) {
        self.ratio_label = label.to_owned();
        if let Some(engine) = self.engine.as_mut() {
            engine.set_aspect_ratio(label);
        }
    }

    fn handle_keyboard(ctx: &egui::Context) -> KeyboardState {
        ctx.input(|input| {
            let plain = !input.modifiers.shift;
            KeyboardState {
                next_image: (plain && input.key_pressed(egui::Key::ArrowRight))
                    || input.key_pressed(egui::Key::K),
                prev_image: (plain && input.key_pressed(egui::Key::ArrowLeft))
                    || input.key_pressed(egui::Key::J),
                toggle_skip: (plain && input.key_pressed(egui::Key::ArrowUp))
                    || input.key_pressed(egui::Key::I),
                remove: input.key_pressed(egui::Key::O) || input.key_pressed(egui::Key::Delete),
                reset_crop: input.key_pressed(egui::Key::L),
                toggle_preview: input.key_pressed(egui::Key::Space),
                rotate_cw: input.key_pressed(egui::Key::E),
                rotate_ccw: input.key_pressed(egui::Key::Q),
                flip_h: input.key_pressed(egui::Key::H),
                flip_v: input.key_pressed(egui::Key::V),
                export_all: input.key_pressed(egui::Key::Enter),
                escape: input.key_pressed(egui::Key::Escape),
                ratio_preset: if input.key_pressed(egui::Key::Num1) {
                    Some("1:1")
                } else if input.key_pressed(egui::Key::Num2) {
                    Some("4:5")
                } else if input.key_pressed(egui::Key::Num3) {
                    Some("9:16")
                } else {
                    None
                },
                move_up: input.modifiers.shift && input.key_down(egui::Key::ArrowUp),
                move_down: input.modifiers.shift && input.key_down(egui::Key::ArrowDown),
                move_left: input.modifiers.shift && input.key_down(egui::Key::ArrowLeft),
                move_right: input.modifiers.shift && input.key_down(egui::Key::ArrowRight),
            }
        })
    }

    fn request_shutdown(&mut self, ctx: &egui::Context) {
        self.finished = true;
        if self.exporter.is_idle() {
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }
    }
}

impl App for BatchCropApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut Frame) {
        let _ = frame;
        let now = Instant::now();

        // Completed loads, delivered back on this thread.
        let completions: Vec<LoadResult> = self.result_rx.try_iter().collect();
        for completion in completions {
            if let Some(ready) = self.cache.on_load_result(completion) {
                if self.current.as_ref() == Some(&ready.path) {
                    self.refresh_displayed(ctx);
                }
            }
        }

        for status in self.exporter.check_completions() {
            match status.result {
                Ok(output) => info!(output = %output.display(), "exported"),
                Err(err) => {
                    warn!(source = %status.source.display(), "export failed: {err:#}");
                    self.status = format!("Export failed for {}: {err:#}", status.source.display());
                }
            }
        }

        if self.finished {
            if self.exporter.is_idle() {
                ctx.send_viewport_cmd(ViewportCommand::Close);
                return;
            }
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.heading(format!(
                        "Finishing exports... ({} remaining)",
                        self.exporter.pending.len()
                    ));
                });
            });
            ctx.request_repaint();
            return;
        }

        let keys = Self::handle_keyboard(ctx);

        if keys.escape {
            if self.exporter.is_idle() {
                self.request_shutdown(ctx);
                return;
            }
            self.exit_attempt_count += 1;
            let remaining = 3usize.saturating_sub(self.exit_attempt_count);
            if remaining == 0 {
                self.request_shutdown(ctx);
                return;
            }
            self.status =
                format!("Export in progress! Press ESC {remaining} more times to force exit.");
        }

        if keys.next_image {
            self.navigator.request_step(1, now);
        }
        if keys.prev_image {
            self.navigator.request_step(-1, now);
        }
        if keys.toggle_skip {
            self.toggle_skip_current();
        }
        if keys.remove {
            self.remove_current(ctx);
        }
        if keys.toggle_preview {
            self.set_preview_all(!self.preview_all);
        }
        if keys.export_all {
            self.export_all();
        }
        if let Some(label) = keys.ratio_preset {
            self.set_ratio_preset(label);
            self.mark_current_touched();
        }

        let mut edited = false;
        if let Some(engine) = self.engine.as_mut() {
            if keys.reset_crop {
                engine.reset_crop();
                edited = true;
            }
            if keys.rotate_cw {
                engine.rotate_quarter(1);
                edited = true;
            }
            if keys.rotate_ccw {
                engine.rotate_quarter(-1);
                edited = true;
            }
            if keys.flip_h {
                engine.flip_horizontal();
                edited = true;
            }
            if keys.flip_v {
                engine.flip_vertical();
                edited = true;
            }
            if self.canvas.handle_arrow_movement(&keys, engine) {
                edited = true;
            }
        }
        if edited {
            self.mark_current_touched();
        }

        // Coalesced navigation resolves once the debounce window closes.
        if let Some(net) = self.navigator.poll(now) {
            if let Some(current) = self.current_index() {
                let target = resolve_step(current, net, self.sequence.paths(), |p| {
                    self.records.is_hidden(p)
                });
                if let Some(path) = target.and_then(|idx| self.sequence.get(idx).cloned()) {
                    self.display_image(path, ctx);
                }
            }
        }

        if self.touch_deadline.is_some_and(|deadline| now >= deadline) {
            self.mark_current_touched();
        }

        let mut pointer_edited = false;
        let mut crop_changed = false;
        let mut preview_toggle: Option<bool> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            painter.rect_filled(response.rect, egui::CornerRadius::ZERO, Color32::WHITE);

            let draw_text_with_bg = |pos: egui::Pos2,
                                     align: egui::Align2,
                                     text: String,
                                     font: egui::FontId,
                                     color: Color32| {
                let galley = ctx.fonts_mut(|fonts| fonts.layout_no_wrap(text, font, color));
                let rect = align.anchor_size(pos, galley.size());
                painter.rect_filled(
                    rect.expand(4.0),
                    egui::CornerRadius::same(4),
                    Color32::from_black_alpha(178),
                );
                painter.galley(rect.min, galley, Color32::WHITE);
            };

            let current_hidden = self
                .current
                .as_deref()
                .is_some_and(|p| self.records.is_hidden(p));
            let displayed_current = matches!(
                (&self.displayed, &self.current),
                (Some((shown, _)), Some(current)) if shown == current
            );

            if let (Some(engine), Some(texture), true) = (
                self.engine.as_mut(),
                self.texture.as_ref(),
                displayed_current,
            ) {
                let metrics = if engine.preview() {
                    ViewMetrics::fit_region(response.rect, engine.crop_rect())
                } else {
                    ViewMetrics::fit(response.rect, engine.bounds())
                };
                if response.double_clicked() {
                    let inside = response
                        .interact_pointer_pos()
                        .is_some_and(|p| metrics.rect_to_screen(engine.crop_rect()).contains(p));
                    if inside {
                        let preview = !engine.preview();
                        engine.set_preview(preview);
                        preview_toggle = Some(preview);
                    }
                }
                pointer_edited = self.canvas.handle_pointer(&response, &metrics, engine);
                self.canvas
                    .draw(&painter, response.rect, &metrics, engine, texture);
                crop_changed = engine.take_changed();

                if current_hidden {
                    draw_text_with_bg(
                        response.rect.center_top() + egui::vec2(0.0, 12.0),
                        egui::Align2::CENTER_TOP,
                        "SKIPPED".to_string(),
                        egui::FontId::proportional(20.0),
                        Color32::YELLOW,
                    );
                }
            } else {
                painter.text(
                    response.rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Loading...",
                    egui::FontId::proportional(24.0),
                    Color32::from_gray(90),
                );
            }

            if !self.exporter.pending.is_empty() {
                draw_text_with_bg(
                    response.rect.right_bottom() + egui::vec2(-12.0, -40.0),
                    egui::Align2::RIGHT_BOTTOM,
                    format!("Exporting {} images...", self.exporter.pending.len()),
                    egui::FontId::proportional(16.0),
                    Color32::YELLOW,
                );
            }

            draw_text_with_bg(
                response.rect.left_bottom() + egui::vec2(12.0, -12.0),
                egui::Align2::LEFT_BOTTOM,
                self.status.clone(),
                egui::FontId::monospace(16.0),
                Color32::WHITE,
            );

            draw_text_with_bg(
                response.rect.right_bottom() + egui::vec2(-12.0, -12.0),
                egui::Align2::RIGHT_BOTTOM,
                "\u{2190}/\u{2192}: Navigate | Q/E: Rotate | H/V: Flip | L: Reset | Space: Preview | \u{2191}: Skip | Enter: Export | Esc: Quit"
                    .to_string(),
                egui::FontId::monospace(14.0),
                Color32::from_gray(200),
            );

            if let Some(idx) = self.current_index() {
                draw_text_with_bg(
                    response.rect.left_top() + egui::vec2(12.0, 12.0),
                    egui::Align2::LEFT_TOP,
                    format!("Image {} of {}", idx + 1, self.sequence.len()),
                    egui::FontId::proportional(20.0),
                    Color32::WHITE,
                );
            }
        });

        if let Some(preview) = preview_toggle {
            self.preview_all = preview;
        }
        if pointer_edited {
            self.mark_current_touched();
        } else if crop_changed {
            self.save_current_state();
        }

        ctx.request_repaint();
    }
}
